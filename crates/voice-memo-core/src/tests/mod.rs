mod audio;
mod catalog;
mod support;
