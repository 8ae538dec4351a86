use std::collections::BTreeMap;
use std::net::ToSocketAddrs;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::config::model::{Config, Retention, Target, TargetDefaults};
use crate::error::{ConfigError, TargetSpecError};
use crate::types::RetentionSlice;
use crate::util::paths::{absolute, resolve_source};

const SSH_PORT: u16 = 22;

/// Checks the named target against the filesystem and DNS and returns it in
/// typed form.
pub fn validate_target(
    config: &Config,
    name: &str,
    defaults: &TargetDefaults,
) -> Result<Target, ConfigError> {
    let value = config
        .target(name)
        .ok_or_else(|| ConfigError::UnknownTarget(name.to_string()))?;
    parse_target(name, value, defaults).map_err(|reason| ConfigError::InvalidTargetSpec {
        target: name.to_string(),
        reason,
    })
}

fn parse_target(
    name: &str,
    value: &Value,
    defaults: &TargetDefaults,
) -> Result<Target, TargetSpecError> {
    let map = value.as_mapping().ok_or(TargetSpecError::NotAMapping)?;

    let (src, dst) = match (field(map, "src_path"), field(map, "dst_path")) {
        (Some(src), Some(dst)) => (src, dst),
        _ => return Err(TargetSpecError::MissingPaths),
    };
    let dst_path = dst
        .as_str()
        .ok_or(TargetSpecError::DestinationNotString)?
        .to_string();
    let src_paths = source_list(src)?;
    for src in &src_paths {
        let resolved = resolve_source(src)?;
        debug!("source {} resolves to {} path(s)", src, resolved.len());
    }

    let keep = field(map, "keep").map(retention).transpose()?;
    let exclude = match field(map, "exclude") {
        Some(value) => string_list(value).ok_or(TargetSpecError::ExcludeNotList)?,
        None => Vec::new(),
    };
    let rate_limit = match field(map, "rate_limit") {
        Some(value) => Some(value.as_u64().ok_or(TargetSpecError::InvalidRateLimit)?),
        None => None,
    };
    let pre_run = command(map, "pre_run")?;
    let post_run = command(map, "post_run")?;
    let dst_srv = string_field(map, "dst_srv")?;
    let cert_path = string_field(map, "cert_path")?;
    let password = string_field(map, "password")?;
    let user = string_field(map, "user")?;

    if let Some(server) = &dst_srv {
        let cert = cert_path.as_deref().unwrap_or(&defaults.cert_path);
        if !absolute(cert).is_file() {
            return Err(TargetSpecError::CertificateNotFound(cert.to_string()));
        }
        if !resolves(server) {
            return Err(TargetSpecError::UnresolvableServer(server.clone()));
        }
    }

    Ok(Target {
        name: name.to_string(),
        src_paths,
        dst_path,
        dst_srv,
        cert_path,
        password,
        user,
        rate_limit,
        keep,
        exclude,
        pre_run,
        post_run,
    })
}

/// A key whose value is YAML `null` counts as absent.
fn field<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|value| !value.is_null())
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_sequence()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

fn source_list(value: &Value) -> Result<Vec<String>, TargetSpecError> {
    let paths = match value {
        Value::String(path) => vec![path.clone()],
        other => string_list(other).ok_or(TargetSpecError::SourceNotPathList)?,
    };
    if paths.is_empty() {
        return Err(TargetSpecError::SourceNotPathList);
    }
    Ok(paths)
}

fn retention(value: &Value) -> Result<Retention, TargetSpecError> {
    let map = value.as_mapping().ok_or(TargetSpecError::KeepNotMapping)?;
    let mut slices = BTreeMap::new();
    for (key, count) in map {
        let label = key.as_str().unwrap_or_default().to_string();
        let slice: RetentionSlice = serde_yaml::from_value(key.clone())
            .map_err(|_| TargetSpecError::UnknownSlice(label.clone()))?;
        if count.is_null() {
            continue;
        }
        let count = count
            .as_u64()
            .ok_or(TargetSpecError::InvalidKeepCount(label))?;
        slices.insert(slice, count);
    }
    Ok(Retention(slices))
}

fn command(map: &Mapping, key: &'static str) -> Result<Option<String>, TargetSpecError> {
    field(map, key)
        .map(|value| {
            value
                .as_str()
                .map(str::to_string)
                .ok_or(TargetSpecError::CommandNotString(key))
        })
        .transpose()
}

fn string_field(map: &Mapping, key: &'static str) -> Result<Option<String>, TargetSpecError> {
    field(map, key)
        .map(|value| {
            value
                .as_str()
                .map(str::to_string)
                .ok_or(TargetSpecError::FieldNotString(key))
        })
        .transpose()
}

fn resolves(host: &str) -> bool {
    match (host, SSH_PORT).to_socket_addrs() {
        Ok(mut addrs) => addrs.next().is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load::parse_config;
    use std::fs::File;
    use std::path::Path;

    fn config_for(body: &str) -> Config {
        parse_config(&format!("targets:\n  home:\n{}", body)).expect("parse")
    }

    fn reason(config: &Config, defaults: &TargetDefaults) -> TargetSpecError {
        match validate_target(config, "home", defaults) {
            Err(ConfigError::InvalidTargetSpec { reason, .. }) => reason,
            other => panic!("expected invalid target spec, got {:?}", other),
        }
    }

    fn source_dir() -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().to_string_lossy().to_string();
        (dir, path)
    }

    #[test]
    fn unknown_target() {
        let config = parse_config("targets:\n  home: {}\n").expect("parse");
        let err = validate_target(&config, "work", &TargetDefaults::default())
            .expect_err("unknown");
        assert!(matches!(err, ConfigError::UnknownTarget(name) if name == "work"));
    }

    #[test]
    fn minimal_local_target() {
        let (_dir, src) = source_dir();
        let config = config_for(&format!("    src_path: {}\n    dst_path: /srv/borg\n", src));
        let target =
            validate_target(&config, "home", &TargetDefaults::default()).expect("valid");
        assert_eq!(target.src_paths, vec![src]);
        assert_eq!(target.dst_path, "/srv/borg");
        assert!(target.keep.is_none());
        assert!(target.exclude.is_empty());
        assert!(target.dst_srv.is_none());
    }

    #[test]
    fn full_target_is_typed() {
        let (dir, src) = source_dir();
        File::create(dir.path().join("a.conf")).expect("touch");
        let config = config_for(&format!(
            concat!(
                "    src_path: [{src}, {src}/*.conf]\n",
                "    dst_path: /srv/borg\n",
                "    rate_limit: 512\n",
                "    exclude: ['*.tmp', /var/cache]\n",
                "    keep: {{daily: 7, hourly: 24, monthly: ~}}\n",
                "    pre_run: systemctl stop db\n",
                "    post_run: systemctl start db\n",
                "    user: backup\n",
            ),
            src = src
        ));
        let target =
            validate_target(&config, "home", &TargetDefaults::default()).expect("valid");
        assert_eq!(target.src_paths.len(), 2);
        assert_eq!(target.rate_limit, Some(512));
        assert_eq!(target.exclude, vec!["*.tmp", "/var/cache"]);
        assert_eq!(target.pre_run.as_deref(), Some("systemctl stop db"));
        assert_eq!(target.user.as_deref(), Some("backup"));
        let keep = target.keep.expect("keep");
        let flags: Vec<_> = keep.flags().collect();
        assert_eq!(
            flags,
            vec![(RetentionSlice::Hourly, 24), (RetentionSlice::Daily, 7)]
        );
    }

    #[test]
    fn target_must_be_mapping() {
        let config = config_for("    - a\n");
        assert_eq!(
            reason(&config, &TargetDefaults::default()),
            TargetSpecError::NotAMapping
        );
    }

    #[test]
    fn missing_paths() {
        let config = config_for("    dst_path: /srv/borg\n");
        assert_eq!(
            reason(&config, &TargetDefaults::default()),
            TargetSpecError::MissingPaths
        );
        let config = config_for("    src_path: /etc\n");
        assert_eq!(
            reason(&config, &TargetDefaults::default()),
            TargetSpecError::MissingPaths
        );
    }

    #[test]
    fn destination_must_be_string() {
        let (_dir, src) = source_dir();
        let config = config_for(&format!("    src_path: {}\n    dst_path: [a]\n", src));
        assert_eq!(
            reason(&config, &TargetDefaults::default()),
            TargetSpecError::DestinationNotString
        );
    }

    #[test]
    fn sources_must_be_strings() {
        let config = config_for("    src_path: [/etc, 3]\n    dst_path: /srv/borg\n");
        assert_eq!(
            reason(&config, &TargetDefaults::default()),
            TargetSpecError::SourceNotPathList
        );
        let config = config_for("    src_path: []\n    dst_path: /srv/borg\n");
        assert_eq!(
            reason(&config, &TargetDefaults::default()),
            TargetSpecError::SourceNotPathList
        );
    }

    #[test]
    fn sources_must_exist() {
        let (_dir, src) = source_dir();
        let missing = format!("{}/absent", src);
        let config = config_for(&format!("    src_path: {}\n    dst_path: /srv\n", missing));
        assert_eq!(
            reason(&config, &TargetDefaults::default()),
            TargetSpecError::SourceNotFound(missing)
        );

        let pattern = format!("{}/*.none", src);
        let config = config_for(&format!("    src_path: '{}'\n    dst_path: /srv\n", pattern));
        assert_eq!(
            reason(&config, &TargetDefaults::default()),
            TargetSpecError::SourceGlobEmpty(pattern)
        );
    }

    #[test]
    fn keep_errors() {
        let (_dir, src) = source_dir();
        let base = format!("    src_path: {}\n    dst_path: /srv\n", src);

        let config = config_for(&format!("{}    keep: [7]\n", base));
        assert_eq!(
            reason(&config, &TargetDefaults::default()),
            TargetSpecError::KeepNotMapping
        );

        let config = config_for(&format!("{}    keep: {{fortnightly: 2}}\n", base));
        assert_eq!(
            reason(&config, &TargetDefaults::default()),
            TargetSpecError::UnknownSlice("fortnightly".to_string())
        );

        let config = config_for(&format!("{}    keep: {{daily: -1}}\n", base));
        assert_eq!(
            reason(&config, &TargetDefaults::default()),
            TargetSpecError::InvalidKeepCount("daily".to_string())
        );

        let config = config_for(&format!("{}    keep: {{daily: lots}}\n", base));
        assert_eq!(
            reason(&config, &TargetDefaults::default()),
            TargetSpecError::InvalidKeepCount("daily".to_string())
        );
    }

    #[test]
    fn optional_field_types() {
        let (_dir, src) = source_dir();
        let base = format!("    src_path: {}\n    dst_path: /srv\n", src);
        let cases = [
            ("    exclude: /tmp\n", TargetSpecError::ExcludeNotList),
            ("    rate_limit: -5\n", TargetSpecError::InvalidRateLimit),
            ("    rate_limit: 1.5\n", TargetSpecError::InvalidRateLimit),
            ("    pre_run: [a, b]\n", TargetSpecError::CommandNotString("pre_run")),
            ("    post_run: 7\n", TargetSpecError::CommandNotString("post_run")),
            ("    user: {a: 1}\n", TargetSpecError::FieldNotString("user")),
        ];
        for (extra, expected) in cases {
            let config = config_for(&format!("{}{}", base, extra));
            assert_eq!(reason(&config, &TargetDefaults::default()), expected, "{}", extra);
        }
    }

    #[test]
    fn remote_target_needs_certificate() {
        let (dir, src) = source_dir();
        let config = config_for(&format!(
            "    src_path: {}\n    dst_path: /srv\n    dst_srv: localhost\n",
            src
        ));
        let defaults = TargetDefaults {
            cert_path: dir.path().join("missing.pem").to_string_lossy().to_string(),
            ..TargetDefaults::default()
        };
        assert!(matches!(
            reason(&config, &defaults),
            TargetSpecError::CertificateNotFound(_)
        ));

        let cert = dir.path().join("id.pem");
        File::create(&cert).expect("touch");
        let defaults = TargetDefaults {
            cert_path: cert.to_string_lossy().to_string(),
            ..TargetDefaults::default()
        };
        let target = validate_target(&config, "home", &defaults).expect("valid");
        assert_eq!(target.dst_srv.as_deref(), Some("localhost"));
    }

    #[test]
    fn remote_target_host_must_resolve() {
        let (dir, src) = source_dir();
        let cert = dir.path().join("id.pem");
        File::create(&cert).expect("touch");
        let config = config_for(&format!(
            "    src_path: {}\n    dst_path: /srv\n    dst_srv: no-such-host.invalid\n    cert_path: {}\n",
            src,
            cert.display()
        ));
        assert_eq!(
            reason(&config, &TargetDefaults::default()),
            TargetSpecError::UnresolvableServer("no-such-host.invalid".to_string())
        );
        assert!(Path::new(&cert).is_file());
    }
}
