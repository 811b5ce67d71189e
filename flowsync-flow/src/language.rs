//! Script language ↔ file extension table.

use flowsync_core::DefaultTs;

/// Compound suffixes first so that `.pg.sql` wins over `.sql`.
const SUFFIX_LANGUAGES: &[(&str, &str)] = &[
    (".bun.ts", "bun"),
    (".deno.ts", "deno"),
    (".native.ts", "nativets"),
    (".frontend.js", "frontend"),
    (".pg.sql", "postgresql"),
    (".my.sql", "mysql"),
    (".bq.sql", "bigquery"),
    (".sf.sql", "snowflake"),
    (".ms.sql", "mssql"),
    (".playbook.yml", "ansible"),
    (".py", "python3"),
    (".go", "go"),
    (".sh", "bash"),
    (".ps1", "powershell"),
    (".gql", "graphql"),
    (".php", "php"),
    (".rs", "rust"),
    (".cs", "csharp"),
    (".sql", "postgresql"),
];

/// Extension (without leading dot) used for an inline script of `language`.
pub fn extension_for(language: &str, default_ts: DefaultTs) -> &'static str {
    if language == default_ts.language() || language == "bunnative" {
        return "ts";
    }
    match language {
        "python3" => "py",
        "bun" => "bun.ts",
        "deno" => "deno.ts",
        "go" => "go",
        "bash" => "sh",
        "powershell" => "ps1",
        "postgresql" => "pg.sql",
        "mysql" => "my.sql",
        "bigquery" => "bq.sql",
        "snowflake" => "sf.sql",
        "mssql" => "ms.sql",
        "graphql" => "gql",
        "nativets" => "native.ts",
        "frontend" => "frontend.js",
        "php" => "php",
        "rust" => "rs",
        "csharp" => "cs",
        "ansible" => "playbook.yml",
        _ => "no_ext",
    }
}

/// Language of a script source file, from its suffix.
pub fn language_for_path(path: &str, default_ts: DefaultTs) -> Option<&'static str> {
    SUFFIX_LANGUAGES
        .iter()
        .find(|(suffix, _)| path.ends_with(suffix))
        .map(|(_, language)| *language)
        .or_else(|| path.ends_with(".ts").then(|| default_ts.language()))
}

/// Script path with its source suffix removed (`f/a/b.pg.sql` → `f/a/b`).
pub fn script_base(path: &str) -> Option<&str> {
    SUFFIX_LANGUAGES
        .iter()
        .map(|(suffix, _)| *suffix)
        .chain(std::iter::once(".ts"))
        .find_map(|suffix| path.strip_suffix(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("python3", DefaultTs::Bun, "py")]
    #[case("bun", DefaultTs::Bun, "ts")]
    #[case("bun", DefaultTs::Deno, "bun.ts")]
    #[case("deno", DefaultTs::Deno, "ts")]
    #[case("bunnative", DefaultTs::Deno, "ts")]
    #[case("postgresql", DefaultTs::Bun, "pg.sql")]
    #[case("ansible", DefaultTs::Bun, "playbook.yml")]
    #[case("cobol", DefaultTs::Bun, "no_ext")]
    fn extension_table(#[case] language: &str, #[case] default_ts: DefaultTs, #[case] ext: &str) {
        assert_eq!(extension_for(language, default_ts), ext);
    }

    #[rstest]
    #[case("f/a/job.pg.sql", Some("postgresql"))]
    #[case("f/a/job.sql", Some("postgresql"))]
    #[case("f/a/job.deno.ts", Some("deno"))]
    #[case("f/a/job.ts", Some("bun"))]
    #[case("f/a/job.py", Some("python3"))]
    #[case("f/a/job.script.yaml", None)]
    fn language_lookup(#[case] path: &str, #[case] language: Option<&str>) {
        assert_eq!(language_for_path(path, DefaultTs::Bun), language);
    }

    #[test]
    fn script_base_strips_compound_suffixes() {
        assert_eq!(script_base("f/a/job.pg.sql"), Some("f/a/job"));
        assert_eq!(script_base("f/a/job.bun.ts"), Some("f/a/job"));
        assert_eq!(script_base("f/a/job.ts"), Some("f/a/job"));
        assert_eq!(script_base("f/a/job.script.yaml"), None);
    }
}
