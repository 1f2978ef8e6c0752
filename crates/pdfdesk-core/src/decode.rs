//! Page counting for previews and split/organize validation

use lopdf::Document;

use crate::error::DeskError;

/// Parse `bytes` and return the page count. `name` labels the error.
pub fn count_pages(name: &str, bytes: &[u8]) -> Result<u32, DeskError> {
    let fail = |message: String| DeskError::Decode {
        file: name.to_string(),
        message,
    };

    if !bytes.starts_with(b"%PDF-") {
        return Err(fail("missing %PDF- header".to_string()));
    }
    let document = Document::load_mem(bytes).map_err(|e| fail(e.to_string()))?;
    match document.get_pages().len() as u32 {
        0 => Err(fail("PDF has no pages".to_string())),
        n => Ok(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Object};

    fn create_test_pdf(num_pages: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = (0..num_pages)
            .map(|_| {
                Object::Reference(doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => Object::Reference(pages_id),
                    "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                }))
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => num_pages as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_counts_pages() {
        assert_eq!(count_pages("a.pdf", &create_test_pdf(3)).unwrap(), 3);
    }

    #[test]
    fn test_rejects_non_pdf() {
        let err = count_pages("notes.txt", b"hello").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not read \"notes.txt\": missing %PDF- header"
        );
    }

    #[test]
    fn test_rejects_unparseable_pdf() {
        assert!(matches!(
            count_pages("bad.pdf", b"%PDF-1.7\nnot really a pdf"),
            Err(DeskError::Decode { .. })
        ));
    }
}
