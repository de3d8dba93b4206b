//! Barrel (index) files only re-export generated modules and hold no
//! hand-written content, so the generated text always replaces them.

pub fn merge_barrel_file(_existing: &str, generated: &str) -> String {
    generated.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_text_wins() {
        let generated = "export * from './users'\nexport * from './posts'\n";
        assert_eq!(merge_barrel_file("export * from './gone'\n// edited\n", generated), generated);
    }
}
