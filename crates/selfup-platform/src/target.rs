use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
    FreeBsd,
    Other(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Aarch64,
    X86,
    Arm,
    Riscv64,
    Other(&'static str),
}

impl Os {
    #[must_use]
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => Self::Linux,
            "macos" => Self::MacOs,
            "windows" => Self::Windows,
            "freebsd" => Self::FreeBsd,
            other => Self::Other(other),
        }
    }

    /// Substrings that identify this OS in a release asset name.
    #[must_use]
    pub fn identifiers(self) -> &'static [&'static str] {
        match self {
            Self::Linux => &["linux"],
            Self::MacOs => &["darwin", "macos"],
            Self::Windows => &["windows"],
            Self::FreeBsd => &["freebsd"],
            Self::Other(_) => &[],
        }
    }
}

const X86_64_IDS: &[&str] = &["x86_64", "amd64", "x64"];
const AARCH64_IDS: &[&str] = &["aarch64", "arm64"];
const X86_IDS: &[&str] = &["i686", "i386", "-386", "_386"];
const ARM_IDS: &[&str] = &["armv7", "armv6", "armhf"];
const RISCV64_IDS: &[&str] = &["riscv64"];

/// Architectures no host mapping exists for, which still rule an asset out
/// of the architecture-neutral fallback.
const FOREIGN_IDS: &[&str] = &[
    "ppc64", "powerpc", "s390x", "mips", "loong64", "loongarch", "sparc", "riscv32", "armel",
    "i586", "wasm32",
];

/// Short names that only count as whole `-`/`.`/`_` separated tokens.
const X86_TOKENS: &[&str] = &["x86", "386"];
const ARM_TOKENS: &[&str] = &["arm", "armv5"];
const OTHER_TOKENS: &[&str] = &["ppc"];

/// `x86_64` is rewritten first so that it never reads as the `x86` token.
fn has_token(name: &str, tokens: &[&str]) -> bool {
    name.replace("x86_64", "amd64")
        .split(['-', '.', '_'])
        .any(|part| tokens.contains(&part))
}

impl Arch {
    #[must_use]
    pub fn current() -> Self {
        match std::env::consts::ARCH {
            "x86_64" => Self::X86_64,
            "aarch64" => Self::Aarch64,
            "x86" => Self::X86,
            "arm" => Self::Arm,
            "riscv64" => Self::Riscv64,
            other => Self::Other(other),
        }
    }

    /// Substrings that identify this architecture in a release asset name.
    #[must_use]
    pub fn identifiers(self) -> &'static [&'static str] {
        match self {
            Self::X86_64 => X86_64_IDS,
            Self::Aarch64 => AARCH64_IDS,
            Self::X86 => X86_IDS,
            Self::Arm => ARM_IDS,
            Self::Riscv64 => RISCV64_IDS,
            Self::Other(_) => &[],
        }
    }

    fn tokens(self) -> &'static [&'static str] {
        match self {
            Self::X86 => X86_TOKENS,
            Self::Arm => ARM_TOKENS,
            _ => &[],
        }
    }

    /// Whether `name` mentions any CPU architecture at all, including ones
    /// no host here maps to.
    #[must_use]
    pub fn is_named_in(name: &str) -> bool {
        let named = [X86_64_IDS, AARCH64_IDS, X86_IDS, ARM_IDS, RISCV64_IDS, FOREIGN_IDS]
            .iter()
            .flat_map(|ids| ids.iter())
            .any(|id| name.contains(id));
        named || [X86_TOKENS, ARM_TOKENS, OTHER_TOKENS]
            .iter()
            .any(|tokens| has_token(name, tokens))
    }
}

/// Host operating system and CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformTarget {
    pub os: Os,
    pub arch: Arch,
}

impl PlatformTarget {
    #[must_use]
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    #[must_use]
    pub fn current() -> Self {
        Self::new(Os::current(), Arch::current())
    }

    /// Case-sensitive substring match against the OS identifiers.
    #[must_use]
    pub fn matches_os(&self, name: &str) -> bool {
        match self.os {
            Os::Other(raw) => name.contains(raw),
            os => os.identifiers().iter().any(|id| name.contains(id)),
        }
    }

    /// Case-sensitive substring match against the architecture identifiers.
    #[must_use]
    pub fn matches_arch(&self, name: &str) -> bool {
        match self.arch {
            Arch::Other(raw) => name.contains(raw),
            arch => {
                arch.identifiers().iter().any(|id| name.contains(id))
                    || has_token(name, arch.tokens())
            }
        }
    }

    /// Primary identifiers, as used in conventional asset names.
    #[must_use]
    pub fn os_id(&self) -> &'static str {
        match self.os {
            Os::Other(raw) => raw,
            os => os.identifiers()[0],
        }
    }

    #[must_use]
    pub fn arch_id(&self) -> &'static str {
        match self.arch {
            Arch::Other(raw) => raw,
            arch => arch.identifiers()[0],
        }
    }
}

impl fmt::Display for PlatformTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os_id(), self.arch_id())
    }
}
