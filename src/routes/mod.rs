pub mod auth;
pub mod charts;
pub mod diary;
pub mod export;
