pub mod address_service;
pub mod attachment_store;
pub mod form_service;
pub mod session;
