use sha2::{Digest, Sha512};

use crate::cpu::CpuDescriptor;

/// Hashes a CPU descriptor into a lowercase hex SHA-512 digest.
///
/// The hashed text is the clock, brand, flags (in reported order) and
/// architecture concatenated without separators, with all whitespace
/// removed.
pub fn fingerprint(descriptor: &CpuDescriptor) -> String {
    let canonical = canonical_text(descriptor);

    let mut hasher = Sha512::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

pub(crate) fn canonical_text(descriptor: &CpuDescriptor) -> String {
    let mut text = format!("{}{}", descriptor.clock_hz, descriptor.brand);
    for flag in &descriptor.flags {
        text.push_str(flag);
    }
    text.push_str(&descriptor.arch);

    text.retain(|c| !c.is_whitespace());
    text
}
