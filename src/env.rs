use std::ffi::CString;

use crate::types::ShellError;

/// The shell's private copy of the environment.
///
/// Entries keep their insertion order; overwriting a variable keeps its
/// position. Spawned children get a snapshot, never a live reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    vars: Vec<(String, String)>,
}

impl Environment {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    /// Copy the inherited process environment once, at start-up.
    pub fn from_process() -> Self {
        let mut env = Self::new();
        for (name, value) in std::env::vars_os() {
            let name = name.to_string_lossy();
            let value = value.to_string_lossy();
            // The OS table can't hold invalid names, but a lossy conversion can make one.
            let _ = env.set(&name, &value, true);
        }
        env
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set(&mut self, name: &str, value: &str, overwrite: bool) -> Result<(), ShellError> {
        if !is_valid_name(name) || value.contains('\0') {
            return Err(ShellError::InvalidName(name.to_string()));
        }
        match self.vars.iter_mut().find(|(key, _)| key == name) {
            Some((_, current)) => {
                if overwrite {
                    *current = value.to_string();
                }
            }
            None => self.vars.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    pub fn unset(&mut self, name: &str) {
        self.vars.retain(|(key, _)| key != name);
    }

    /// `name=value` lines in table order, as `env` prints them.
    pub fn snapshot(&self) -> Vec<String> {
        self.vars
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect()
    }

    /// The snapshot encoded for `execve`. Names and values never contain NUL.
    pub fn to_envp(&self) -> Vec<CString> {
        self.snapshot()
            .into_iter()
            .filter_map(|entry| CString::new(entry).ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut env = Environment::new();
        for (name, value) in iter {
            let _ = env.set(&name.into(), &value.into(), true);
        }
        env
    }
}

pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('=') && !name.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_set_and_get_var() {
        let mut env = Environment::new();
        assert_eq!(env.get("SOME_RANDOM_ENV_VAR_12345"), None);

        env.set("KEY", "VALUE", true).unwrap();
        assert_eq!(env.get("KEY"), Some("VALUE"));
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::from_process();
        assert!(env.get("PATH").is_some());
    }

    #[test]
    fn set_without_overwrite_keeps_existing_value() {
        let mut env = Environment::new();
        env.set("A", "1", true).unwrap();
        env.set("A", "2", false).unwrap();
        assert_eq!(env.get("A"), Some("1"));
        env.set("B", "3", false).unwrap();
        assert_eq!(env.get("B"), Some("3"));
    }

    #[test]
    fn invalid_names_are_rejected_without_change() {
        let mut env: Environment = [("A", "1")].into_iter().collect();
        assert!(matches!(env.set("", "x", true), Err(ShellError::InvalidName(_))));
        assert!(matches!(env.set("B=C", "x", true), Err(ShellError::InvalidName(_))));
        assert_eq!(env.snapshot(), vec!["A=1".to_string()]);
    }

    #[test]
    fn overwrite_keeps_position_and_unset_removes() {
        let mut env: Environment = [("A", "1"), ("B", "2"), ("C", "3")].into_iter().collect();
        env.set("B", "20", true).unwrap();
        assert_eq!(env.snapshot(), vec!["A=1", "B=20", "C=3"]);

        env.unset("B");
        env.unset("MISSING");
        assert_eq!(env.snapshot(), vec!["A=1", "C=3"]);
        assert_eq!(env.len(), 2);
    }

    #[test]
    fn values_may_contain_equals_signs() {
        let mut env = Environment::new();
        env.set("OPTS", "a=b=c", true).unwrap();
        assert_eq!(env.get("OPTS"), Some("a=b=c"));
        assert_eq!(env.to_envp()[0].as_bytes(), b"OPTS=a=b=c");
    }
}
