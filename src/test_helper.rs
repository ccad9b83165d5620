use std::fs;

use rstest::fixture;
use tempfile::TempDir;

use crate::{RequiredKeys, Settings, Source};

pub const SCENARIO_TEMPLATE: &str = "host={{ server_ip }} user={{ ansible_user }}";

/// A scratch directory standing in for the deployment checkout.
#[fixture]
pub fn workspace() -> TempDir {
    tempfile::tempdir().expect("creating temp dir")
}

/// Default settings rooted in `workspace`, with `template` written to the template path.
pub fn settings_in(workspace: &TempDir, template: &str) -> Settings {
    let root = workspace.path();
    let settings = Settings {
        template: root.join("inventory.ini.j2"),
        output: root.join("inventory.ini"),
        required_keys: RequiredKeys::default(),
        source: Source::default(),
    };
    fs::write(&settings.template, template).expect("writing template");
    settings
}
