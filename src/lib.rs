//! Generates the Ansible inventory for the Matrix homeserver role.
//!
//! Required keys are resolved from a [`KeyValueProvider`], validated as a whole, and substituted
//! into a Tera template. The rendered inventory is only written once everything has succeeded.

use std::path::PathBuf;

use tracing::info;

mod bindings;
pub mod config;
mod error;
pub mod keys;
mod output;
pub mod provider;
mod template;
#[cfg(test)]
mod test_helper;

pub use bindings::Bindings;
pub use config::{Settings, Source};
pub use error::{InventoryError, Result};
pub use keys::{Key, RequiredKeys};
pub use output::write_atomically;
pub use provider::{EnvProvider, KeyValueProvider, MapProvider, YamlFileProvider};
pub use template::Template;

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub output: PathBuf,
    pub bytes: usize,
    pub keys: usize,
}

/// Resolves, validates and renders, without writing anything.
pub fn check_inventory(settings: &Settings, provider: &impl KeyValueProvider) -> Result<String> {
    let bindings = Bindings::resolve(&settings.required_keys, provider)?;
    let template = Template::load(&settings.template)?;
    template.render(&settings.required_keys, &bindings)
}

/// Renders the inventory and replaces the output file with it.
///
/// Nothing is written unless every required key resolves and the template renders.
pub fn generate_inventory(settings: &Settings, provider: &impl KeyValueProvider) -> Result<Report> {
    let rendered = check_inventory(settings, provider)?;
    write_atomically(&settings.output, &rendered)?;

    info!(output = ?settings.output, "Inventory generated");

    Ok(Report {
        output: settings.output.clone(),
        bytes: rendered.len(),
        keys: settings.required_keys.len(),
    })
}

#[cfg(test)]
mod tests {
    use std::{env, fs};

    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;
    use crate::test_helper::{settings_in, workspace, SCENARIO_TEMPLATE};

    fn provider(server_ip: &str, ansible_user: &str) -> MapProvider {
        MapProvider::new()
            .with("server_ip", server_ip)
            .with("ansible_user", ansible_user)
    }

    #[rstest]
    fn renders_and_writes_inventory(workspace: TempDir) {
        let settings = settings_in(&workspace, SCENARIO_TEMPLATE);

        let report = generate_inventory(&settings, &provider("10.0.0.5", "deploy")).unwrap();

        let written = fs::read_to_string(&settings.output).unwrap();
        assert_eq!("host=10.0.0.5 user=deploy", written);
        assert!(!written.contains("{{"));
        assert_eq!(written.len(), report.bytes);
        assert_eq!(2, report.keys);
        assert_eq!(settings.output, report.output);
    }

    #[rstest]
    fn blank_value_leaves_existing_output_untouched(workspace: TempDir) {
        let settings = settings_in(&workspace, SCENARIO_TEMPLATE);
        fs::write(&settings.output, "previous").unwrap();

        let Err(InventoryError::MissingConfiguration { keys }) =
            generate_inventory(&settings, &provider("", "deploy"))
        else {
            panic!("expected missing configuration");
        };

        assert_eq!(vec![Key::new("server_ip").unwrap()], keys);
        assert_eq!("previous", fs::read_to_string(&settings.output).unwrap());
    }

    #[rstest]
    fn missing_template_writes_nothing(workspace: TempDir) {
        let settings = settings_in(&workspace, SCENARIO_TEMPLATE);
        fs::remove_file(&settings.template).unwrap();

        let result = generate_inventory(&settings, &provider("10.0.0.5", "deploy"));

        assert!(matches!(
            result,
            Err(InventoryError::TemplateNotFound { .. })
        ));
        assert!(!settings.output.exists());
    }

    #[rstest]
    fn undeclared_placeholder_writes_nothing(workspace: TempDir) {
        let settings = settings_in(&workspace, "{{ server_ip }} {{ postgres_password }}");

        let result = generate_inventory(&settings, &provider("10.0.0.5", "deploy"));

        assert!(matches!(
            result,
            Err(InventoryError::UndefinedPlaceholder { ref name }) if name == "postgres_password"
        ));
        assert!(!settings.output.exists());
    }

    #[rstest]
    fn repeated_runs_are_byte_identical(workspace: TempDir) {
        let settings = settings_in(&workspace, SCENARIO_TEMPLATE);
        let provider = provider("10.0.0.5", "deploy");

        generate_inventory(&settings, &provider).unwrap();
        let first = fs::read(&settings.output).unwrap();
        generate_inventory(&settings, &provider).unwrap();
        let second = fs::read(&settings.output).unwrap();

        assert_eq!(first, second);
    }

    #[rstest]
    fn check_does_not_write(workspace: TempDir) {
        let settings = settings_in(&workspace, SCENARIO_TEMPLATE);

        let rendered = check_inventory(&settings, &provider("10.0.0.5", "deploy")).unwrap();

        assert_eq!("host=10.0.0.5 user=deploy", rendered);
        assert!(!settings.output.exists());
    }

    #[rstest]
    fn values_are_rendered_as_supplied(workspace: TempDir) {
        let settings = settings_in(&workspace, "[{{ server_ip }}]");

        generate_inventory(&settings, &provider(" 10.0.0.5 ", "deploy")).unwrap();

        assert_eq!("[ 10.0.0.5 ]", fs::read_to_string(&settings.output).unwrap());
    }

    #[rstest]
    #[case::empty("MI_LIB_EMPTY_", "")]
    #[case::whitespace_only("MI_LIB_WHITESPACE_", "   ")]
    fn blank_environment_variables_are_missing(
        workspace: TempDir,
        #[case] prefix: &str,
        #[case] blank: &str,
    ) {
        env::set_var(format!("{prefix}SERVER_IP"), blank);
        env::set_var(format!("{prefix}ANSIBLE_USER"), "deploy");
        let settings = settings_in(&workspace, SCENARIO_TEMPLATE);

        let result = generate_inventory(&settings, &EnvProvider::new(prefix));

        let Err(InventoryError::MissingConfiguration { keys }) = result else {
            panic!("expected missing configuration");
        };
        assert_eq!(vec![Key::new("server_ip").unwrap()], keys);
        assert!(!settings.output.exists());
    }

    #[test]
    fn environment_scenario_renders() {
        env::set_var("MI_LIB_SET_SERVER_IP", "10.0.0.5");
        env::set_var("MI_LIB_SET_ANSIBLE_USER", "deploy");

        let bindings =
            Bindings::resolve(&RequiredKeys::default(), &EnvProvider::new("MI_LIB_SET_")).unwrap();

        assert_eq!(
            "host=10.0.0.5 user=deploy",
            Template::from_source(SCENARIO_TEMPLATE)
                .render(&RequiredKeys::default(), &bindings)
                .unwrap()
        );
    }

    #[rstest]
    fn yaml_file_source(workspace: TempDir) {
        let env_file = workspace.path().join(".env.yml");
        fs::write(&env_file, "server_ip: 192.168.1.10\nansible_user: matrix\n").unwrap();
        let mut settings = settings_in(&workspace, SCENARIO_TEMPLATE);
        settings.source = Source::YamlFile { path: env_file };

        let provider = settings.source.provider().unwrap();
        generate_inventory(&settings, &provider).unwrap();

        assert_eq!(
            "host=192.168.1.10 user=matrix",
            fs::read_to_string(&settings.output).unwrap()
        );
    }
}
