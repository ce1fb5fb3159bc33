use crate::error::{DnsError, Result};
use std::ffi::CString;

/// Returns the index of the network interface with the given name.
///
/// ### Arguments
/// - `interface_name` - the name of the interface (e.g. `tun0`)
pub fn interface_index(interface_name: &str) -> Result<i32> {
    let name = CString::new(interface_name).map_err(|_| DnsError::Interface {
        name: interface_name.to_owned(),
        reason: "name contains a NUL byte".to_owned(),
    })?;

    // SAFETY: `name` is a valid NUL-terminated string that outlives the call.
    let index = unsafe { libc::if_nametoindex(name.as_ptr()) };

    if index == 0 {
        return Err(DnsError::Interface {
            name: interface_name.to_owned(),
            reason: std::io::Error::last_os_error().to_string(),
        });
    }

    i32::try_from(index).map_err(|_| DnsError::Interface {
        name: interface_name.to_owned(),
        reason: format!("index {index} is out of range"),
    })
}
