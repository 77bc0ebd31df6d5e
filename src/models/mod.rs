pub mod actor;
pub mod audit;
pub mod document;
pub mod installation;
pub mod installer;
pub mod status;
