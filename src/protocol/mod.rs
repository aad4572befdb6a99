/// Protocol module - hardware-independent DS28C36 command/response protocol
///
/// This module defines the command set, frame layouts, settle times and the
/// identity checksum without depending on any specific bus backend.

pub mod commands;
pub mod crc8;
pub mod frame;
pub mod timing;
