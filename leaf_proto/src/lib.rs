tonic::include_proto!("leaf_service");

pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("leaf_descriptor");
