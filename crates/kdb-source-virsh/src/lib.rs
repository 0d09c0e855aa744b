//! [`HypervisorSource`](kdb_source::HypervisorSource) backed by the `virsh`
//! client, talking to libvirtd over a read-only `qemu+ssh` connection.

mod virsh;

pub use virsh::*;
