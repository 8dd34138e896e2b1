pub mod db;
pub mod leetcode;
pub mod user_data;
