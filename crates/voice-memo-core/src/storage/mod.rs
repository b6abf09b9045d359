mod file_name;
mod fs;
mod gateway;

pub use {
    file_name::{numbered_recording_file_name, parse_recording_timestamp, recording_file_name},
    fs::{FsStorageGateway, STAGING_DIR_NAME},
    gateway::StorageGateway,
};
