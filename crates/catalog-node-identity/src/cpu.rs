//! CPU descriptor collection.
//!
//! # Rust Learning Note
//!
//! [`CpuInfoSource`] is the seam between the pure fingerprint function and
//! the host. Production code uses [`HostCpuInfo`], which reads procfs and
//! sysfs; tests plug in fixed descriptors or point `HostCpuInfo` at
//! temporary files.

use std::path::{Path, PathBuf};

use crate::error::IdentityError;

const PROC_CPUINFO: &str = "/proc/cpuinfo";
const CPU0_CPUFREQ: &str = "/sys/devices/system/cpu/cpu0/cpufreq";

/// Keys carrying the CPU brand string, in order of preference.
const BRAND_KEYS: &[&str] = &["model name", "cpu model", "Processor", "cpu", "Hardware"];

/// Keys carrying the feature flag list.
const FLAG_KEYS: &[&str] = &["flags", "Features", "features"];

/// The hardware facts a node identity is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuDescriptor {
    /// Nominal clock speed in Hz.
    pub clock_hz: u64,
    pub brand: String,
    /// Feature flags in the order the kernel reports them.
    pub flags: Vec<String>,
    pub arch: String,
}

/// Something that can describe the local CPU.
pub trait CpuInfoSource {
    fn describe(&self) -> Result<CpuDescriptor, IdentityError>;
}

/// Reads the CPU descriptor of the running host.
#[derive(Debug, Clone)]
pub struct HostCpuInfo {
    cpuinfo_path: PathBuf,
    cpufreq_dir: PathBuf,
}

impl Default for HostCpuInfo {
    fn default() -> Self {
        Self {
            cpuinfo_path: PathBuf::from(PROC_CPUINFO),
            cpufreq_dir: PathBuf::from(CPU0_CPUFREQ),
        }
    }
}

impl HostCpuInfo {
    /// Uses alternative procfs/sysfs locations.
    pub fn with_paths(cpuinfo_path: impl Into<PathBuf>, cpufreq_dir: impl Into<PathBuf>) -> Self {
        Self {
            cpuinfo_path: cpuinfo_path.into(),
            cpufreq_dir: cpufreq_dir.into(),
        }
    }

    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    fn describe_with_arch(&self, arch: String) -> Result<CpuDescriptor, IdentityError> {
        let text = read_text(&self.cpuinfo_path)?;
        let fields = CpuInfoFields::parse(&text);

        let brand = fields.brand().ok_or(IdentityError::MissingField("brand"))?;
        let flags = fields.flags().ok_or(IdentityError::MissingField("flags"))?;
        let clock_hz = match read_cpufreq_khz(&self.cpufreq_dir)? {
            Some(khz) => khz * 1_000,
            None => fields.clock_hz(&brand)?,
        };

        if arch.trim().is_empty() {
            return Err(IdentityError::MissingField("arch"));
        }

        Ok(CpuDescriptor {
            clock_hz,
            brand,
            flags,
            arch,
        })
    }
}

impl CpuInfoSource for HostCpuInfo {
    #[cfg(target_os = "linux")]
    fn describe(&self) -> Result<CpuDescriptor, IdentityError> {
        self.describe_with_arch(sysinfo::System::cpu_arch())
    }

    #[cfg(not(target_os = "linux"))]
    fn describe(&self) -> Result<CpuDescriptor, IdentityError> {
        Err(IdentityError::Unsupported(std::env::consts::OS))
    }
}

/// Reads a text file, dropping byte sequences that are not valid UTF-8.
fn read_text(path: &Path) -> Result<String, IdentityError> {
    let bytes = std::fs::read(path).map_err(|source| IdentityError::Read {
        path: path.display().to_string(),
        source,
    })?;

    Ok(bytes.utf8_chunks().map(|chunk| chunk.valid()).collect())
}

/// Nominal frequency from cpufreq, in kHz, if the kernel exposes one.
fn read_cpufreq_khz(dir: &Path) -> Result<Option<u64>, IdentityError> {
    for file in ["base_frequency", "cpuinfo_max_freq"] {
        let path = dir.join(file);
        if !path.exists() {
            continue;
        }

        let text = read_text(&path)?;
        let khz = text
            .trim()
            .parse::<u64>()
            .map_err(|_| IdentityError::InvalidClock(text.trim().to_string()))?;
        if khz > 0 {
            return Ok(Some(khz));
        }
    }

    Ok(None)
}

/// Key/value pairs of the first processor block of `/proc/cpuinfo`, plus
/// the machine-wide trailer some architectures append.
#[derive(Debug, Default)]
struct CpuInfoFields {
    first_block: Vec<(String, String)>,
    trailer: Vec<(String, String)>,
}

impl CpuInfoFields {
    fn parse(text: &str) -> Self {
        let mut blocks = Vec::new();
        let mut current = Vec::new();

        for line in text.lines() {
            if line.trim().is_empty() {
                if !current.is_empty() {
                    blocks.push(std::mem::take(&mut current));
                }
                continue;
            }

            if let Some((key, value)) = line.split_once(':') {
                current.push((key.trim().to_string(), value.trim().to_string()));
            }
        }
        if !current.is_empty() {
            blocks.push(current);
        }

        let mut blocks = blocks.into_iter();
        let first_block = blocks.next().unwrap_or_default();
        let trailer = blocks
            .last()
            .filter(|block| !block.iter().any(|(key, _)| key == "processor"))
            .unwrap_or_default();

        CpuInfoFields {
            first_block,
            trailer,
        }
    }

    fn lookup(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| {
            self.first_block
                .iter()
                .chain(self.trailer.iter())
                .find(|(k, v)| k == key && !v.is_empty())
                .map(|(_, v)| v.as_str())
        })
    }

    fn brand(&self) -> Option<String> {
        self.lookup(BRAND_KEYS).map(str::to_string)
    }

    fn flags(&self) -> Option<Vec<String>> {
        let flags: Vec<String> = self
            .lookup(FLAG_KEYS)?
            .split_whitespace()
            .map(str::to_string)
            .collect();
        (!flags.is_empty()).then_some(flags)
    }

    /// Nominal clock speed from the brand string ("@ 2.60GHz").
    /// `cpu MHz` is the current scaling frequency and is never used.
    fn clock_hz(&self, brand: &str) -> Result<u64, IdentityError> {
        clock_from_brand(brand).ok_or(IdentityError::MissingField("clock speed"))
    }
}

fn clock_from_brand(brand: &str) -> Option<u64> {
    let (_, speed) = brand.rsplit_once('@')?;
    let speed = speed.trim();

    let (number, scale) = if let Some(n) = speed.strip_suffix("GHz") {
        (n, 1_000_000_000.0)
    } else if let Some(n) = speed.strip_suffix("MHz") {
        (n, 1_000_000.0)
    } else {
        return None;
    };

    let value: f64 = number.trim().parse().ok()?;
    (value > 0.0).then(|| (value * scale).round() as u64)
}
