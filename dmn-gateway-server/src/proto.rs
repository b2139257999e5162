//! Generated protobuf and tonic code

pub mod dinner {
    pub mod v1 {
        tonic::include_proto!("dinner.v1");
    }
}
