use anyhow::Result;

use crate::cargo;

/// `lessonlink-infra` feature sets that must keep compiling
const FEATURE_COMBINATIONS: &[&[&str]] = &[
    &[], // default
    &["keychain"],
];

pub fn test_feature_matrix() -> Result<()> {
    let total = FEATURE_COMBINATIONS.len();
    println!("Checking {total} lessonlink-infra feature combinations...");

    for (index, features) in FEATURE_COMBINATIONS.iter().enumerate() {
        let joined = features.join(",");
        let mut args = vec!["check", "-p", "lessonlink-infra"];
        if !features.is_empty() {
            args.extend(["--features", joined.as_str()]);
        }
        let label = if features.is_empty() { "default" } else { joined.as_str() };

        println!("\n[{}/{total}] cargo {}", index + 1, args.join(" "));
        cargo(&args, &format!("Feature combination '{label}' failed to compile"))?;
        println!("✅ Features '{label}' compiled successfully");
    }

    println!("\n✅ All {total} feature combinations compile successfully!");
    Ok(())
}
