use std::{
    fs::File,
    io::{self, BufRead},
    path::Path,
};

/// Reads class names, one per line. Blank lines are skipped.
pub fn load_class_labels(filepath: &Path) -> io::Result<Vec<String>> {
    let file = File::open(filepath)?;
    let reader = io::BufReader::new(file);
    let mut labels = Vec::new();

    for line_result in reader.lines() {
        let line = line_result?;
        let label = line.trim();
        if !label.is_empty() {
            labels.push(label.to_string());
        }
    }

    if labels.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("No class labels in {:?}", filepath),
        ));
    }

    Ok(labels)
}
