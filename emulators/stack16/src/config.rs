use std::env;

pub const STRICT_OPCODES_ENV: &str = "STACK16_STRICT_OPCODES";
pub const PERMISSIVE_OPCODES_ENV: &str = "STACK16_PERMISSIVE_OPCODES";

/// What `step` does with a byte that is not in the opcode table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownOpcodePolicy {
    /// Skip the opcode byte and carry on.
    #[default]
    Permissive,
    /// Fail the step with `Error::UnknownOpcode`.
    Strict,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub unknown_opcode: UnknownOpcodePolicy,
}

impl EngineConfig {
    pub fn strict() -> Self {
        Self {
            unknown_opcode: UnknownOpcodePolicy::Strict,
        }
    }

    /// Permissive unless `STACK16_STRICT_OPCODES` is set and not overridden by
    /// `STACK16_PERMISSIVE_OPCODES`.
    pub fn from_env() -> Self {
        Self::from_flags(env_flag(STRICT_OPCODES_ENV), env_flag(PERMISSIVE_OPCODES_ENV))
    }

    fn from_flags(strict: bool, permissive: bool) -> Self {
        if strict && !permissive {
            Self::strict()
        } else {
            Self::default()
        }
    }
}

fn env_flag(name: &str) -> bool {
    matches!(
        env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("True")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_permissive() {
        assert_eq!(
            EngineConfig::default().unknown_opcode,
            UnknownOpcodePolicy::Permissive
        );
    }

    #[test]
    fn permissive_flag_overrides_strict() {
        assert_eq!(EngineConfig::from_flags(true, false), EngineConfig::strict());
        assert_eq!(EngineConfig::from_flags(true, true), EngineConfig::default());
        assert_eq!(EngineConfig::from_flags(false, false), EngineConfig::default());
    }
}
