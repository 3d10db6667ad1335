//! Small helpers shared across modules: UID/GID access for permission
//! preservation, and the content-hash function backing
//! `Storage::compute_hash` and checksum-only change comparison (§4.5 step 3).
#![allow(dead_code)]

/// Get the effective user ID of the current process
///
/// Returns the effective UID on Unix systems, or a default value on other platforms.
/// This function wraps the unsafe libc call in a safe interface.
#[allow(unsafe_code)]
pub fn get_effective_uid() -> u32 {
	#[cfg(unix)]
	{
		// SAFETY: geteuid() is always safe to call - it just returns a value
		// from the process credentials without any side effects.
		unsafe { libc::geteuid() }
	}

	#[cfg(not(unix))]
	{
		1000
	}
}

/// Get the effective group ID of the current process
#[allow(unsafe_code)]
pub fn get_effective_gid() -> u32 {
	#[cfg(unix)]
	{
		// SAFETY: getegid() is always safe to call - it just returns a value
		// from the process credentials without any side effects.
		unsafe { libc::getegid() }
	}

	#[cfg(not(unix))]
	{
		1000
	}
}

/// The local machine's hostname, used as the `RenameLocal` suffix identity
#[allow(unsafe_code)]
pub fn hostname() -> String {
	#[cfg(unix)]
	{
		let mut buf = [0u8; 256];
		// SAFETY: buf is a valid, appropriately-sized, non-null buffer; gethostname
		// writes at most buf.len() bytes and is safe to call with such a buffer.
		let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
		if rc != 0 {
			return "localhost".to_string();
		}
		let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
		String::from_utf8_lossy(&buf[..end]).into_owned()
	}

	#[cfg(not(unix))]
	{
		"localhost".to_string()
	}
}

/// Hash a buffer using BLAKE3 and return its hex-encoded digest
pub fn hash(buf: &[u8]) -> String {
	hex::encode(blake3::hash(buf).as_bytes())
}

/// Hash a buffer using BLAKE3 and return the raw 32-byte digest
pub fn hash_binary(buf: &[u8]) -> [u8; 32] {
	*blake3::hash(buf).as_bytes()
}

/// Convert a hex-encoded digest back to its raw bytes
pub fn hash_from_hex(hex_digest: &str) -> Result<[u8; 32], Box<dyn std::error::Error>> {
	let bytes = hex::decode(hex_digest)?;
	if bytes.len() != 32 {
		return Err(format!("hash must be 32 bytes, got {}", bytes.len()).into());
	}
	let mut hash = [0u8; 32];
	hash.copy_from_slice(&bytes);
	Ok(hash)
}


// vim: ts=4
