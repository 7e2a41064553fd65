pub mod designate;
pub mod init_config;
