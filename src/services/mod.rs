pub mod local_folder_service;
pub mod webdav;
