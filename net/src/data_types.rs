/*
Aliases for data types for readability and to allow resizing in future
*/

pub type PortNumber = u16; // Conforms to TCP/IP port numbering
pub type ConnectionId = u64; // Sequence number of a connection accepted by one listener
pub type ListenBacklog = u32; // Pending connections queued by the OS before accept
