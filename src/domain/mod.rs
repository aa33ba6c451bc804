// Domain layer: the record schema and the reader/writer ports the pipeline runs against.

pub mod model;
pub mod ports;
