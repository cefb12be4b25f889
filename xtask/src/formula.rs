//! The packaging formula: a TOML recipe declaring the binary, its
//! self-test needle, and pinned vendor resources.
//!
//! `fetch` downloads and verifies resources against their sha256 pins,
//! `install` builds and stages everything under a prefix, `check` runs
//! the installed binary's self-test, and `pin` maintains the digests.

use std::io::Write;
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Serialize, Deserialize)]
pub struct Formula {
    pub package: Package,
    #[serde(default, rename = "resource")]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    /// Name of the installed entry point.
    pub bin: String,
    /// String the self-test requires in `--help` output.
    pub test_needle: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub url: String,
    pub sha256: String,
}

pub fn load(path: &Path) -> anyhow::Result<Formula> {
    let contents = fs::read_to_string(path)?;
    toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

/// Download every resource into the cache, verifying each digest.
/// Any mismatch aborts the run.
pub fn fetch(formula: &Formula, cache: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(cache)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("create async runtime")?;

    for resource in &formula.resources {
        let dest = cache.join(&resource.name);
        let actual = runtime
            .block_on(download(&resource.url, &dest))
            .with_context(|| format!("fetch {}", resource.name))?;
        verify_digest(resource, &actual)?;
        println!("fetched {} ({})", resource.name, &actual[..12]);
    }
    Ok(())
}

/// Stream a URL to disk, hashing as it downloads.
async fn download(url: &str, dest: &Path) -> anyhow::Result<String> {
    use futures::StreamExt;

    let response = reqwest::get(url).await?.error_for_status()?;
    let mut file = fs::File::create(dest)?;
    let mut hasher = Sha256::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        hasher.update(&chunk);
        file.write_all(&chunk)?;
    }
    Ok(hex::encode(hasher.finalize()))
}

fn verify_digest(resource: &Resource, actual: &str) -> anyhow::Result<()> {
    if !actual.eq_ignore_ascii_case(&resource.sha256) {
        bail!(
            "checksum mismatch for {}: expected {}, got {}",
            resource.name,
            resource.sha256,
            actual
        );
    }
    Ok(())
}

/// Sha256 hex digest of a file.
pub fn hash_file(path: &Path) -> anyhow::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)
        .with_context(|| format!("hash {}", path.display()))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Build the release binary and install it with its resources under `prefix`.
///
/// Refuses to install from a cache with missing or unverified resources.
pub fn install(formula: &Formula, cache: &Path, prefix: &Path) -> anyhow::Result<()> {
    // Verify the whole cache before touching the prefix.
    for resource in &formula.resources {
        let cached = cache.join(&resource.name);
        if !cached.exists() {
            bail!(
                "resource {} missing from cache; run `xtask fetch` first",
                resource.name
            );
        }
        verify_digest(resource, &hash_file(&cached)?)?;
    }

    let status = Command::new("cargo")
        .args(["build", "--release", "-p", "sage-core"])
        .status()
        .context("run cargo build")?;
    if !status.success() {
        bail!("cargo build failed");
    }

    let bin_dir = prefix.join("bin");
    fs::create_dir_all(&bin_dir)?;
    let built = Path::new("target/release").join(&formula.package.bin);
    fs::copy(&built, bin_dir.join(&formula.package.bin))?;

    for resource in &formula.resources {
        let vendor_dir = prefix.join("libexec").join("vendor").join(&resource.name);
        fs::create_dir_all(&vendor_dir)?;
        fs::copy(cache.join(&resource.name), vendor_dir.join(&resource.name))?;
    }

    println!(
        "installed {} to {}",
        formula.package.bin,
        prefix.display()
    );
    Ok(())
}

/// Run the installed binary's self-test: `--help` must contain the needle.
pub fn check(formula: &Formula, prefix: &Path) -> anyhow::Result<()> {
    let bin = prefix.join("bin").join(&formula.package.bin);
    let output = Command::new(&bin)
        .arg("--help")
        .output()
        .with_context(|| format!("run {}", bin.display()))?;
    if !output.status.success() {
        bail!("{} --help exited with {}", formula.package.bin, output.status);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.contains(&formula.package.test_needle) {
        bail!(
            "self-test failed: `{} --help` output does not contain \"{}\"",
            formula.package.bin,
            formula.package.test_needle
        );
    }
    println!("check ok: output contains \"{}\"", formula.package.test_needle);
    Ok(())
}

/// Recompute a resource's sha256 pin from a local file and rewrite the recipe.
pub fn pin(formula_path: &Path, resource_name: &str, file: &Path) -> anyhow::Result<()> {
    let mut formula = load(formula_path)?;
    let digest = hash_file(file)?;

    let resource = formula
        .resources
        .iter_mut()
        .find(|r| r.name == resource_name)
        .with_context(|| format!("no resource named {resource_name} in the formula"))?;
    resource.sha256 = digest.clone();

    let rendered = toml::to_string_pretty(&formula).context("serialize formula")?;
    fs::write(formula_path, rendered)?;
    println!("pinned {resource_name} to {digest}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[package]
name = "shell_sage"
bin = "ssage"
test_needle = "ShellSage"

[[resource]]
name = "alpha"
url = "https://example.invalid/alpha.tar.gz"
sha256 = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"

[[resource]]
name = "beta"
url = "https://example.invalid/beta.tar.gz"
sha256 = "0000000000000000000000000000000000000000000000000000000000000000"
"#;

    fn write_sample(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("formula.toml");
        fs::write(&path, SAMPLE).unwrap();
        path
    }

    #[test]
    fn parse_sample_formula() {
        let formula: Formula = toml::from_str(SAMPLE).unwrap();
        assert_eq!(formula.package.name, "shell_sage");
        assert_eq!(formula.package.bin, "ssage");
        assert_eq!(formula.package.test_needle, "ShellSage");
        assert_eq!(formula.resources.len(), 2);
        assert_eq!(formula.resources[0].name, "alpha");
    }

    #[test]
    fn formula_without_resources_parses() {
        let formula: Formula = toml::from_str(
            "[package]\nname = \"x\"\nbin = \"x\"\ntest_needle = \"x\"\n",
        )
        .unwrap();
        assert!(formula.resources.is_empty());
    }

    #[test]
    fn hash_file_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data");
        fs::write(&path, "hello").unwrap();
        assert_eq!(
            hash_file(&path).unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn verify_accepts_matching_digest_case_insensitively() {
        let resource = Resource {
            name: "alpha".to_string(),
            url: String::new(),
            sha256: "ABCDEF".to_string(),
        };
        assert!(verify_digest(&resource, "abcdef").is_ok());
    }

    #[test]
    fn verify_rejects_mismatch_naming_resource() {
        let resource = Resource {
            name: "alpha".to_string(),
            url: String::new(),
            sha256: "aaaa".to_string(),
        };
        let err = verify_digest(&resource, "bbbb").unwrap_err().to_string();
        assert!(err.contains("checksum mismatch for alpha"));
        assert!(err.contains("expected aaaa"));
        assert!(err.contains("got bbbb"));
    }

    #[test]
    fn install_refuses_missing_resource() {
        let dir = tempfile::tempdir().unwrap();
        let formula: Formula = toml::from_str(SAMPLE).unwrap();
        let err = install(&formula, &dir.path().join("cache"), &dir.path().join("prefix"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("missing from cache"));
    }

    #[test]
    fn install_refuses_corrupted_resource() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("cache");
        fs::create_dir_all(&cache).unwrap();
        // "hello" matches alpha's pin; beta's content does not match its pin.
        fs::write(cache.join("alpha"), "hello").unwrap();
        fs::write(cache.join("beta"), "tampered").unwrap();

        let formula: Formula = toml::from_str(SAMPLE).unwrap();
        let err = install(&formula, &cache, &dir.path().join("prefix"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("checksum mismatch for beta"));
    }

    #[test]
    fn pin_rewrites_digest() {
        let dir = tempfile::tempdir().unwrap();
        let formula_path = write_sample(dir.path());
        let payload = dir.path().join("beta.tar.gz");
        fs::write(&payload, "hello").unwrap();

        pin(&formula_path, "beta", &payload).unwrap();

        let formula = load(&formula_path).unwrap();
        assert_eq!(
            formula.resources[1].sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        // Untouched fields survive the rewrite.
        assert_eq!(formula.package.test_needle, "ShellSage");
        assert_eq!(formula.resources[0].url, "https://example.invalid/alpha.tar.gz");
    }

    #[test]
    fn pin_unknown_resource_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let formula_path = write_sample(dir.path());
        let payload = dir.path().join("data");
        fs::write(&payload, "x").unwrap();

        let err = pin(&formula_path, "gamma", &payload).unwrap_err().to_string();
        assert!(err.contains("no resource named gamma"));
    }
}
