pub mod aggregate;
pub mod catalog;
pub mod gateway;
pub mod images;
pub mod mutations;
pub mod notifications;
pub mod recommendations;
pub mod refresh;
pub mod search;
