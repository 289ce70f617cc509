#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Stand-in for steamcmd: creates a staged payload for every requested item
/// unless its id is listed in `FAKE_FAIL_IDS`.
const FAKE_TOOL: &str = r#"#!/bin/sh
echo "$@" >> "$(dirname "$0")/invocations.log"
dir=""
while [ $# -gt 0 ]; do
  case "$1" in
    +force_install_dir) dir="$2"; shift 2 ;;
    +login) echo "Logging in user '$2' to Steam Public..."; shift 3 ;;
    +set_steam_guard_code) shift 2 ;;
    +workshop_download_item)
      case " $FAKE_FAIL_IDS " in
        *" $3 "*) echo "ERROR! Download item $3 failed (Failure)." ;;
        *)
          mkdir -p "$dir/steamapps/workshop/content/$2/$3/addons"
          echo "payload $3" > "$dir/steamapps/workshop/content/$2/$3/addons/$3.pbo"
          echo ""
          echo "Success. Downloaded item $3 to \"$dir/steamapps/workshop/content/$2/$3\""
          ;;
      esac
      shift 3 ;;
    *) shift ;;
  esac
done
"#;

pub struct TestEnv {
    _tmp: TempDir,
    pub root: PathBuf,
    pub home: PathBuf,
    pub tool: PathBuf,
    pub staging: PathBuf,
    pub mods: PathBuf,
    pub config: PathBuf,
    pub credentials: PathBuf,
}

impl TestEnv {
    /// Isolated environment with a `local` target and the given catalog.
    pub fn new(catalog: &[(&str, &str)]) -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let root = tmp.path().to_path_buf();
        let home = root.join("home");
        let staging = root.join("staging");
        let mods = root.join("server");
        let tool_dir = root.join("steamcmd");
        for dir in [&home, &mods, &tool_dir] {
            fs::create_dir_all(dir).expect("create dir");
        }

        let tool = tool_dir.join("steamcmd.sh");
        fs::write(&tool, FAKE_TOOL).expect("write fake tool");
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).expect("chmod fake tool");

        let credentials = root.join("credentials.txt");
        fs::write(&credentials, "alice\nhunter2\n").expect("write credentials");

        let config = root.join("config.toml");
        let env = Self {
            _tmp: tmp,
            root,
            home,
            tool,
            staging,
            mods,
            config,
            credentials,
        };
        env.write_config(catalog, "");
        env
    }

    /// Rewrite the config; `extra` is prepended as top-level TOML keys.
    pub fn write_config(&self, catalog: &[(&str, &str)], extra: &str) {
        let mut toml = format!(
            "{extra}\ntool_path = \"{}\"\nstaging_root = \"{}\"\nmods_root = \"{}\"\n\n[target]\nkind = \"local\"\n",
            self.tool.display(),
            self.staging.display(),
            self.mods.display(),
        );
        for (id, name) in catalog {
            toml.push_str(&format!("\n[[mods]]\nid = \"{id}\"\nname = \"{name}\"\n"));
        }
        fs::write(&self.config, toml).expect("write config");
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("workshop-sync"));
        cmd.env("HOME", &self.home)
            .env("XDG_CONFIG_HOME", self.home.join(".config"))
            .env_remove("WORKSHOP_SYNC_CONFIG")
            .env_remove("FAKE_FAIL_IDS")
            .env("RUST_LOG", "warn")
            .current_dir(&self.root)
            .arg("--config")
            .arg(&self.config);
        cmd
    }

    /// Pre-install a mod directory as if an earlier pass had moved it.
    pub fn install(&self, name: &str) {
        let dir = self.mod_dir(name);
        fs::create_dir_all(&dir).expect("create mod dir");
        fs::write(dir.join("meta.cpp"), "existing").expect("write mod file");
    }

    pub fn mod_dir(&self, name: &str) -> PathBuf {
        self.mods.join(format!("@{name}"))
    }

    /// Lines the fake tool was invoked with, one per run.
    pub fn tool_invocations(&self) -> Vec<String> {
        let log = self.tool.with_file_name("invocations.log");
        read_lines(&log)
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .map(|s| s.lines().map(String::from).collect())
        .unwrap_or_default()
}
