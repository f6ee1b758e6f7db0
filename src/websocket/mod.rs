pub mod handler;
pub mod session;
pub mod msg_load_handler;
pub mod msg_save_handler;
pub mod msg_cursor_handler;
pub mod msg_check_active_handler;
