pub mod assets;
pub mod build_info;
pub mod response;
pub mod tracked_id;
pub mod uid;
