use crate::models::Library;

pub fn parse_version(s: &str) -> (i32, i32, i32) {
    let parts: Vec<&str> = s.split('.').collect();
    (
        parts.first().map_or(0, |x| x.parse().unwrap_or(0)),
        parts.get(1).map_or(0, |x| x.parse().unwrap_or(0)),
        parts.get(2).map_or(0, |x| x.parse().unwrap_or(0)),
    )
}

/// Java major version a game version needs when its JSON does not say.
pub fn default_java_for(version_id: &str) -> u32 {
    let base = if version_id.contains("fabric") {
        version_id.rsplit('-').next().unwrap_or(version_id)
    } else {
        version_id
    };
    match parse_version(base) {
        (1, minor, patch) if minor > 20 || (minor == 20 && patch >= 5) => 21,
        (1, minor, _) if minor >= 18 => 17,
        (1, 17, _) => 16,
        (major, _, _) if major > 1 => 21,
        _ => 8,
    }
}

pub fn get_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

pub fn classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") { ";" } else { ":" }
}

pub fn is_library_allowed(lib: &Library, os_name: &str) -> bool {
    let rules = match &lib.rules {
        Some(r) => r,
        None => return true,
    };
    let mut allowed = false;
    for rule in rules {
        let matches = if let Some(os) = &rule.os {
            if let Some(name) = &os.name {
                name == os_name
            } else {
                true
            }
        } else {
            true
        };
        if matches {
            allowed = rule.action == "allow";
        }
    }
    allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OsRule, Rule};

    fn lib_with_rules(rules: Option<Vec<Rule>>) -> Library {
        Library {
            name: "a:b:1".to_string(),
            downloads: None,
            natives: None,
            rules,
            extract: None,
            url: None,
        }
    }

    fn rule(action: &str, os: Option<&str>) -> Rule {
        Rule {
            action: action.to_string(),
            os: os.map(|n| OsRule { name: Some(n.to_string()) }),
        }
    }

    #[test]
    fn test_library_rules() {
        assert!(is_library_allowed(&lib_with_rules(None), "linux"));

        let osx_only = lib_with_rules(Some(vec![rule("allow", Some("osx"))]));
        assert!(!is_library_allowed(&osx_only, "linux"));
        assert!(is_library_allowed(&osx_only, "osx"));

        let all_but_osx = lib_with_rules(Some(vec![rule("allow", None), rule("disallow", Some("osx"))]));
        assert!(is_library_allowed(&all_but_osx, "linux"));
        assert!(!is_library_allowed(&all_but_osx, "osx"));
    }

    #[test]
    fn test_default_java_for() {
        assert_eq!(default_java_for("1.8.9"), 8);
        assert_eq!(default_java_for("1.17.1"), 16);
        assert_eq!(default_java_for("1.20.1"), 17);
        assert_eq!(default_java_for("1.20.6"), 21);
        assert_eq!(default_java_for("1.21"), 21);
        assert_eq!(default_java_for("fabric-loader-0.15.0-1.19.4"), 17);
    }
}
