//! Registry of known project configuration options.
//!
//! Each option belongs to a scope (`platformio` or `env`) and is addressed as
//! `"<scope>.<name>"`. Metadata drives list parsing, value checking, system
//! environment overrides and legacy renames.

use once_cell::sync::Lazy;

/// Value kind used to check option values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Str,
    Int,
    Bool,
    Choice(&'static [&'static str]),
    IntRange(i64, i64),
    /// Existing file path.
    Path,
}

impl OptionKind {
    /// Check a single value against this kind.
    pub fn check(&self, value: &str) -> Result<(), String> {
        match self {
            OptionKind::Str => Ok(()),
            OptionKind::Int => value
                .trim()
                .parse::<i64>()
                .map(|_| ())
                .map_err(|_| format!("{} is not a valid integer", value)),
            OptionKind::Bool => match value.trim().to_lowercase().as_str() {
                "1" | "0" | "true" | "false" | "yes" | "no" | "y" | "n" | "on" | "off" => Ok(()),
                _ => Err(format!("{} is not a valid boolean", value)),
            },
            OptionKind::Choice(choices) => {
                if choices.contains(&value) {
                    Ok(())
                } else {
                    Err(format!(
                        "invalid choice: {}. (choose from {})",
                        value,
                        choices.join(", ")
                    ))
                }
            }
            OptionKind::IntRange(lo, hi) => {
                let n = value
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| format!("{} is not a valid integer", value))?;
                if n < *lo || n > *hi {
                    Err(format!("{} is not in the valid range of {} to {}", n, lo, hi))
                } else {
                    Ok(())
                }
            }
            OptionKind::Path => {
                if std::path::Path::new(value).is_file() {
                    Ok(())
                } else {
                    Err(format!("File \"{}\" does not exist", value))
                }
            }
        }
    }
}

/// Metadata for one configuration option.
#[derive(Debug, Clone)]
pub struct ConfigOption {
    pub scope: &'static str,
    pub name: &'static str,
    pub kind: OptionKind,
    pub multiple: bool,
    pub sysenvvar: Option<&'static str>,
    pub buildenvvar: Option<&'static str>,
    pub oldnames: &'static [&'static str],
}

impl ConfigOption {
    const fn new(scope: &'static str, name: &'static str) -> Self {
        ConfigOption {
            scope,
            name,
            kind: OptionKind::Str,
            multiple: false,
            sysenvvar: None,
            buildenvvar: None,
            oldnames: &[],
        }
    }

    const fn platformio(name: &'static str) -> Self {
        Self::new("platformio", name)
    }

    const fn env(name: &'static str) -> Self {
        Self::new("env", name)
    }

    const fn kind(mut self, kind: OptionKind) -> Self {
        self.kind = kind;
        self
    }

    const fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    const fn sysenv(mut self, var: &'static str) -> Self {
        self.sysenvvar = Some(var);
        self
    }

    const fn buildenv(mut self, var: &'static str) -> Self {
        self.buildenvvar = Some(var);
        self
    }

    const fn oldnames(mut self, names: &'static [&'static str]) -> Self {
        self.oldnames = names;
        self
    }

    /// Registry key, e.g. `env.upload_port`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.scope, self.name)
    }
}

static OPTIONS: Lazy<Vec<ConfigOption>> = Lazy::new(|| {
    vec![
        // [platformio]
        ConfigOption::platformio("description"),
        ConfigOption::platformio("default_envs")
            .oldnames(&["env_default"])
            .multiple()
            .sysenv("PLATFORMIO_DEFAULT_ENVS"),
        ConfigOption::platformio("extra_configs").multiple(),
        ConfigOption::platformio("core_dir")
            .oldnames(&["home_dir"])
            .sysenv("PLATFORMIO_CORE_DIR"),
        ConfigOption::platformio("globallib_dir").sysenv("PLATFORMIO_GLOBALLIB_DIR"),
        ConfigOption::platformio("platforms_dir").sysenv("PLATFORMIO_PLATFORMS_DIR"),
        ConfigOption::platformio("packages_dir").sysenv("PLATFORMIO_PACKAGES_DIR"),
        ConfigOption::platformio("cache_dir").sysenv("PLATFORMIO_CACHE_DIR"),
        ConfigOption::platformio("build_cache_dir").sysenv("PLATFORMIO_BUILD_CACHE_DIR"),
        ConfigOption::platformio("workspace_dir").sysenv("PLATFORMIO_WORKSPACE_DIR"),
        ConfigOption::platformio("build_dir").sysenv("PLATFORMIO_BUILD_DIR"),
        ConfigOption::platformio("libdeps_dir").sysenv("PLATFORMIO_LIBDEPS_DIR"),
        ConfigOption::platformio("lib_dir").sysenv("PLATFORMIO_LIB_DIR"),
        ConfigOption::platformio("include_dir").sysenv("PLATFORMIO_INCLUDE_DIR"),
        ConfigOption::platformio("src_dir").sysenv("PLATFORMIO_SRC_DIR"),
        ConfigOption::platformio("test_dir").sysenv("PLATFORMIO_TEST_DIR"),
        ConfigOption::platformio("boards_dir").sysenv("PLATFORMIO_BOARDS_DIR"),
        ConfigOption::platformio("data_dir").sysenv("PLATFORMIO_DATA_DIR"),
        ConfigOption::platformio("shared_dir").sysenv("PLATFORMIO_SHARED_DIR"),
        // [env] generic
        ConfigOption::env("platform").buildenv("PIOPLATFORM"),
        ConfigOption::env("platform_packages").multiple(),
        ConfigOption::env("framework").multiple().buildenv("PIOFRAMEWORK"),
        // board
        ConfigOption::env("board").buildenv("BOARD"),
        ConfigOption::env("board_build.mcu")
            .oldnames(&["board_mcu"])
            .buildenv("BOARD_MCU"),
        ConfigOption::env("board_build.f_cpu")
            .oldnames(&["board_f_cpu"])
            .buildenv("BOARD_F_CPU"),
        ConfigOption::env("board_build.f_flash")
            .oldnames(&["board_f_flash"])
            .buildenv("BOARD_F_FLASH"),
        ConfigOption::env("board_build.flash_mode")
            .oldnames(&["board_flash_mode"])
            .buildenv("BOARD_FLASH_MODE"),
        // build
        ConfigOption::env("build_type").kind(OptionKind::Choice(&["release", "debug"])),
        ConfigOption::env("build_flags")
            .multiple()
            .sysenv("PLATFORMIO_BUILD_FLAGS")
            .buildenv("BUILD_FLAGS"),
        ConfigOption::env("src_build_flags")
            .multiple()
            .sysenv("PLATFORMIO_SRC_BUILD_FLAGS")
            .buildenv("SRC_BUILD_FLAGS"),
        ConfigOption::env("build_unflags")
            .multiple()
            .sysenv("PLATFORMIO_BUILD_UNFLAGS")
            .buildenv("BUILD_UNFLAGS"),
        ConfigOption::env("src_filter")
            .multiple()
            .sysenv("PLATFORMIO_SRC_FILTER")
            .buildenv("SRC_FILTER"),
        ConfigOption::env("targets").multiple(),
        // upload
        ConfigOption::env("upload_port")
            .sysenv("PLATFORMIO_UPLOAD_PORT")
            .buildenv("UPLOAD_PORT"),
        ConfigOption::env("upload_protocol").buildenv("UPLOAD_PROTOCOL"),
        ConfigOption::env("upload_speed")
            .kind(OptionKind::Int)
            .buildenv("UPLOAD_SPEED"),
        ConfigOption::env("upload_flags")
            .multiple()
            .sysenv("PLATFORMIO_UPLOAD_FLAGS")
            .buildenv("UPLOAD_FLAGS"),
        ConfigOption::env("upload_resetmethod").buildenv("UPLOAD_RESETMETHOD"),
        ConfigOption::env("upload_command").buildenv("UPLOADCMD"),
        // monitor
        ConfigOption::env("monitor_port"),
        ConfigOption::env("monitor_speed").oldnames(&["monitor_baud"]),
        ConfigOption::env("monitor_rts").kind(OptionKind::IntRange(0, 1)),
        ConfigOption::env("monitor_dtr").kind(OptionKind::IntRange(0, 1)),
        ConfigOption::env("monitor_flags").multiple(),
        // library
        ConfigOption::env("lib_deps")
            .oldnames(&["lib_use", "lib_force", "lib_install"])
            .multiple(),
        ConfigOption::env("lib_ignore").multiple(),
        ConfigOption::env("lib_extra_dirs")
            .multiple()
            .sysenv("PLATFORMIO_LIB_EXTRA_DIRS"),
        ConfigOption::env("lib_ldf_mode").kind(OptionKind::Choice(&[
            "off", "chain", "deep", "chain+", "deep+",
        ])),
        ConfigOption::env("lib_compat_mode")
            .kind(OptionKind::Choice(&["off", "soft", "strict"])),
        ConfigOption::env("lib_archive").kind(OptionKind::Bool),
        // test
        ConfigOption::env("test_filter").multiple(),
        ConfigOption::env("test_ignore").multiple(),
        ConfigOption::env("test_port"),
        ConfigOption::env("test_speed").kind(OptionKind::Int),
        ConfigOption::env("test_transport"),
        ConfigOption::env("test_build_project_src").kind(OptionKind::Bool),
        // debug
        ConfigOption::env("debug_tool"),
        ConfigOption::env("debug_init_break"),
        ConfigOption::env("debug_init_cmds").multiple(),
        ConfigOption::env("debug_extra_cmds").multiple(),
        ConfigOption::env("debug_load_cmds")
            .oldnames(&["debug_load_cmd"])
            .multiple(),
        ConfigOption::env("debug_load_mode")
            .kind(OptionKind::Choice(&["always", "modified", "manual"])),
        ConfigOption::env("debug_server").multiple(),
        ConfigOption::env("debug_port"),
        ConfigOption::env("debug_svd_path").kind(OptionKind::Path),
        // other
        ConfigOption::env("extra_scripts")
            .oldnames(&["extra_script"])
            .multiple()
            .sysenv("PLATFORMIO_EXTRA_SCRIPTS"),
    ]
});

/// All registered options, in declaration order.
pub fn all() -> &'static [ConfigOption] {
    &OPTIONS
}

/// Look up an option by scope and name.
pub fn lookup(scope: &str, name: &str) -> Option<&'static ConfigOption> {
    OPTIONS.iter().find(|o| o.scope == scope && o.name == name)
}

/// Map of legacy option names to their current names.
pub fn renamed_options() -> Vec<(&'static str, &'static str)> {
    OPTIONS
        .iter()
        .flat_map(|o| o.oldnames.iter().map(move |old| (*old, o.name)))
        .collect()
}
