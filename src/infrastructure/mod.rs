pub mod json_export;
pub mod session_storage;
pub mod viacep;
