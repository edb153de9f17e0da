pub mod gestpipe_env;
