use crate::domain::StructuredData;

/// Renders the STRUCTURED-DATA field.
///
/// Each element becomes `[id name="value" ...]`, elements are concatenated
/// without separators and an empty section renders as `-`. Parameter values
/// are written as given.
pub fn render_structured_data(data: &StructuredData) -> String {
    match data {
        StructuredData::Raw(raw) if raw.is_empty() => StructuredData::NIL.to_string(),
        StructuredData::Raw(raw) => raw.clone(),
        StructuredData::Elements(elements) => {
            let mut rendered = String::new();
            for (id, params) in elements {
                rendered.push('[');
                rendered.push_str(id);
                for (name, value) in params {
                    rendered.push(' ');
                    rendered.push_str(name);
                    rendered.push_str("=\"");
                    rendered.push_str(value);
                    rendered.push('"');
                }
                rendered.push(']');
            }
            if rendered.is_empty() {
                StructuredData::NIL.to_string()
            } else {
                rendered
            }
        }
    }
}
