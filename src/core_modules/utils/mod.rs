pub mod buffer_io;
