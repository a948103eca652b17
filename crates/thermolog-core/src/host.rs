//! Host identity.

use log::warn;

const FALLBACK_HOSTNAME: &str = "localhost";

/// Name this machine's records are stored under.
pub fn local_hostname() -> String {
    if let Some(name) = gethostname() {
        return name;
    }
    match std::fs::read_to_string("/proc/sys/kernel/hostname") {
        Ok(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => {
            warn!("hostname unavailable, recording as '{FALLBACK_HOSTNAME}'");
            FALLBACK_HOSTNAME.to_string()
        }
    }
}

fn gethostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: buf is valid for buf.len() bytes; gethostname writes at most that many.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return None;
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let name = String::from_utf8_lossy(&buf[..len]).trim().to_string();
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hostname_is_never_empty() {
        assert!(!local_hostname().is_empty());
    }
}
