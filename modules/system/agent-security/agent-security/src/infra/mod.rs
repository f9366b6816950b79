//! Host-side collaborators: attach info and signing keys.

pub mod attach_info;
pub mod key_file;

pub use attach_info::StaticAttachInfo;
pub use key_file::KeyFileProvider;
