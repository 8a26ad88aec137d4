pub mod chunk_writer;
