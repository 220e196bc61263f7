use crate::output::print_json;
use graduate_core::keys;

pub fn run(json: bool) -> anyhow::Result<()> {
    let path = keys::default_public_key()?;
    let key = keys::read_public_key(&path)?;
    if json {
        print_json(&serde_json::json!({ "path": path, "key": key }))?;
    } else {
        println!("{key}");
    }
    Ok(())
}
