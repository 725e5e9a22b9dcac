//! Generated run/log scripts.

use crate::error::{Error, Result};
use crate::shell;

/// Default run script: enter the checkout, run the before-commands, export
/// the environment, fold stderr into stdout, and `exec` the real command so
/// the daemon supervises it directly rather than a wrapper shell.
pub const DEFAULT_RUN_TEMPLATE: &str = "#!/bin/sh
cd {checkout_path}
{before_cmds}
{env_exports}
exec 2>&1
exec {cmd}
";

/// Default log script: timestamped multiplexed log writer.
pub const DEFAULT_LOG_TEMPLATE: &str = "#!/bin/sh
exec multilog t ./main
";

/// Values available to script templates.
///
/// `checkout_path` and every environment value are shell-quoted at render
/// time; `before_cmds` and `cmd` are emitted verbatim, since they are
/// commands rather than arguments.
#[derive(Debug, Clone)]
pub struct ScriptContext {
    pub checkout_path: String,
    pub before_cmds: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cmd: String,
}

impl ScriptContext {
    fn slot(&self, name: &str) -> Option<String> {
        match name {
            "checkout_path" => Some(shell::quote(&self.checkout_path)),
            "before_cmds" => Some(self.before_cmds.join("\n")),
            "env_exports" => Some(
                self.env
                    .iter()
                    .map(|(key, value)| format!("export {}={}", key, shell::quote(value)))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            "cmd" => Some(self.cmd.clone()),
            _ => None,
        }
    }
}

/// A script template with named, validated slots.
///
/// Slots are written `{name}`; `{{` and `}}` emit literal braces. A slot the
/// context does not define fails the render with [`Error::UnknownSlot`]
/// instead of producing a script with a hole in it.
#[derive(Debug, Clone, Copy)]
pub struct ScriptTemplate<'a> {
    source: &'a str,
}

impl<'a> ScriptTemplate<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    pub fn render(&self, ctx: &ScriptContext) -> Result<String> {
        let src = self.source;
        let bytes = src.as_bytes();
        let mut out = String::with_capacity(src.len());
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'{' => {
                    if bytes.get(i + 1) == Some(&b'{') {
                        out.push('{');
                        i += 2;
                    } else if let Some(close) = src[i + 1..].find('}') {
                        let name = &src[i + 1..i + 1 + close];
                        let value = ctx.slot(name).ok_or_else(|| Error::UnknownSlot {
                            slot: name.to_string(),
                        })?;
                        out.push_str(&value);
                        i += close + 2;
                    } else {
                        return Err(Error::UnknownSlot {
                            slot: src[i + 1..].to_string(),
                        });
                    }
                }
                b'}' => {
                    out.push('}');
                    i += if bytes.get(i + 1) == Some(&b'}') { 2 } else { 1 };
                }
                _ => {
                    let start = i;
                    while i < bytes.len() && bytes[i] != b'{' && bytes[i] != b'}' {
                        i += 1;
                    }
                    out.push_str(&src[start..i]);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ScriptContext {
        ScriptContext {
            checkout_path: "/srv/deploy/checkouts/app/main/20260807_120000-0123456789a".to_string(),
            before_cmds: vec!["ulimit -n 4096".to_string(), "umask 022".to_string()],
            env: vec![
                ("GIT_COMMIT".to_string(), "0123456789abcdef0123".to_string()),
                ("RACK_ENV".to_string(), "production".to_string()),
            ],
            cmd: "bundle exec puma".to_string(),
        }
    }

    #[test]
    fn default_run_template_has_the_expected_shape() {
        let script = ScriptTemplate::new(DEFAULT_RUN_TEMPLATE).render(&ctx()).unwrap();
        assert_eq!(
            script,
            "#!/bin/sh\n\
             cd /srv/deploy/checkouts/app/main/20260807_120000-0123456789a\n\
             ulimit -n 4096\n\
             umask 022\n\
             export GIT_COMMIT=0123456789abcdef0123\n\
             export RACK_ENV=production\n\
             exec 2>&1\n\
             exec bundle exec puma\n"
        );
    }

    #[test]
    fn default_log_template_is_slot_free() {
        let script = ScriptTemplate::new(DEFAULT_LOG_TEMPLATE).render(&ctx()).unwrap();
        assert_eq!(script, "#!/bin/sh\nexec multilog t ./main\n");
    }

    #[test]
    fn env_values_are_shell_quoted() {
        let mut context = ctx();
        context.env = vec![(
            "EVIL".to_string(),
            "'; rm -rf / #".to_string(),
        )];
        let script = ScriptTemplate::new("{env_exports}").render(&context).unwrap();
        assert_eq!(script, "export EVIL=''\\''; rm -rf / #'");
    }

    #[test]
    fn checkout_path_is_shell_quoted_when_needed() {
        let mut context = ctx();
        context.checkout_path = "/srv/deploy/check outs/app".to_string();
        let script = ScriptTemplate::new("cd {checkout_path}").render(&context).unwrap();
        assert_eq!(script, "cd '/srv/deploy/check outs/app'");
    }

    #[test]
    fn unknown_slots_fail_validation() {
        let err = ScriptTemplate::new("echo {nope}").render(&ctx()).unwrap_err();
        assert!(matches!(err, Error::UnknownSlot { slot } if slot == "nope"));
    }

    #[test]
    fn doubled_braces_are_literal() {
        let script = ScriptTemplate::new("awk '{{ print $1 }}'").render(&ctx()).unwrap();
        assert_eq!(script, "awk '{ print $1 }'");
    }
}
