pub mod key_file;
