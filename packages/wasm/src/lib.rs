use berry_document::{parse_html, serialize_html, EditorDocument};
use berry_editor::{
    AttachmentFile, AttachmentResult, Editor, EditorConfig, ImageAttachmentPatch, SelectionRange,
    Surface,
};
use berry_sanitizer::{SanitizeMode, Sanitizer};
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn from_json<T: serde::de::DeserializeOwned>(json: &str, what: &str) -> Result<T, JsValue> {
    serde_json::from_str(json).map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}

fn sanitizer_for(fallback: bool) -> Sanitizer {
    if fallback {
        Sanitizer::with_mode(SanitizeMode::Fallback)
    } else {
        Sanitizer::new()
    }
}

/// Sanitize markup against the editor's allow-list
#[wasm_bindgen(js_name = sanitizeHtml)]
pub fn sanitize_html_js(html: &str, fallback: bool) -> String {
    sanitizer_for(fallback).sanitize(html)
}

/// Sanitize markup and return `{ html, report }` as JSON
#[wasm_bindgen(js_name = sanitizeWithReport)]
pub fn sanitize_with_report_js(html: &str, fallback: bool) -> Result<String, JsValue> {
    #[derive(Serialize)]
    struct Output {
        html: String,
        report: berry_sanitizer::SanitizeReport,
    }

    let (html, report) = sanitizer_for(fallback).sanitize_with_report(html);
    to_json(&Output { html, report })
}

/// Parse markup and return the document model as JSON
#[wasm_bindgen(js_name = parseHtml)]
pub fn parse_html_js(html: &str) -> Result<String, JsValue> {
    to_json(&parse_html(html))
}

/// Serialize a document model (JSON) back to markup
#[wasm_bindgen(js_name = serializeDocument)]
pub fn serialize_document_js(json: &str) -> Result<String, JsValue> {
    let doc = EditorDocument::from_json(json)
        .map_err(|e| JsValue::from_str(&format!("Invalid document: {}", e)))?;
    Ok(serialize_html(&doc))
}

/// Headless editor handle. The host mirrors its own surface into it with
/// `setHtml`/`setSelection` and reads results back with `getHtml`.
#[wasm_bindgen]
pub struct BerryEditor {
    inner: Editor,
}

#[wasm_bindgen]
impl BerryEditor {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<BerryEditor, JsValue> {
        let config = match config_json.as_deref() {
            Some(json) => EditorConfig::from_json(json)
                .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?,
            None => EditorConfig::default(),
        };
        let mut inner = Editor::new(config);
        inner.bind(Surface::new());
        Ok(BerryEditor { inner })
    }

    /// Replace the content and forget history
    #[wasm_bindgen(js_name = loadHtml)]
    pub fn load_html(&mut self, html: &str) {
        self.inner.load_html(html);
    }

    #[wasm_bindgen(js_name = setHtml)]
    pub fn set_html(&mut self, html: &str, add_to_history: bool) -> bool {
        self.inner.set_html(html, add_to_history)
    }

    #[wasm_bindgen(js_name = getHtml)]
    pub fn get_html(&self) -> String {
        self.inner.get_html().to_string()
    }

    /// Document model of the current content as JSON
    #[wasm_bindgen(js_name = getDocument)]
    pub fn get_document(&self) -> Result<String, JsValue> {
        to_json(&self.inner.document())
    }

    /// Run a command by its wire name. `payload_json` is the JSON payload,
    /// if the command takes one.
    pub fn exec(&mut self, command: &str, payload_json: Option<String>) -> Result<bool, JsValue> {
        let payload = match payload_json.as_deref() {
            Some(json) => Some(from_json::<serde_json::Value>(json, "payload")?),
            None => None,
        };
        Ok(self.inner.exec_named(command, payload))
    }

    pub fn undo(&mut self) -> bool {
        self.inner.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.inner.redo()
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.inner.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.inner.can_redo()
    }

    #[wasm_bindgen(js_name = setSelection)]
    pub fn set_selection(&mut self, anchor: usize, focus: usize) -> bool {
        self.inner.set_selection(Some(SelectionRange::new(anchor, focus)))
    }

    #[wasm_bindgen(js_name = clearSelection)]
    pub fn clear_selection(&mut self) -> bool {
        self.inner.set_selection(None)
    }

    /// `{ anchor, focus }` as JSON, or `null`
    #[wasm_bindgen(js_name = getSelection)]
    pub fn get_selection(&self) -> Result<String, JsValue> {
        to_json(&self.inner.get_selection())
    }

    pub fn focus(&mut self) {
        self.inner.focus();
    }

    pub fn blur(&mut self) {
        self.inner.blur();
    }

    /// Formatting state at the caret as JSON
    #[wasm_bindgen(js_name = queryState)]
    pub fn query_state(&self) -> Result<String, JsValue> {
        to_json(&self.inner.query_state())
    }

    /// Insert a pending placeholder for a file (JSON) and return its id
    #[wasm_bindgen(js_name = insertAttachmentPlaceholder)]
    pub fn insert_attachment_placeholder(&mut self, file_json: &str) -> Result<Option<String>, JsValue> {
        let file: AttachmentFile = from_json(file_json, "file")?;
        Ok(self.inner.insert_attachment_placeholder(&file))
    }

    #[wasm_bindgen(js_name = setAttachmentProgress)]
    pub fn set_attachment_progress(&mut self, id: &str, percent: u8) -> bool {
        self.inner.set_attachment_progress(id, percent)
    }

    #[wasm_bindgen(js_name = resolveAttachment)]
    pub fn resolve_attachment(&mut self, id: &str, result_json: &str) -> Result<bool, JsValue> {
        let result: AttachmentResult = from_json(result_json, "upload result")?;
        Ok(self.inner.resolve_attachment(id, &result))
    }

    #[wasm_bindgen(js_name = failAttachment)]
    pub fn fail_attachment(&mut self, id: &str) -> bool {
        self.inner.fail_attachment(id)
    }

    #[wasm_bindgen(js_name = removeAttachment)]
    pub fn remove_attachment(&mut self, id: &str) -> bool {
        self.inner.remove_attachment(id)
    }

    /// Image presentation state as JSON, or `null` for unknown ids
    #[wasm_bindgen(js_name = getImageAttachmentState)]
    pub fn get_image_attachment_state(&self, id: &str) -> Result<String, JsValue> {
        to_json(&self.inner.get_image_attachment_state(id))
    }

    #[wasm_bindgen(js_name = updateImageAttachment)]
    pub fn update_image_attachment(&mut self, id: &str, patch_json: &str) -> Result<bool, JsValue> {
        let patch: ImageAttachmentPatch = from_json(patch_json, "image patch")?;
        Ok(self.inner.update_image_attachment(id, &patch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor(html: &str) -> BerryEditor {
        let mut editor = BerryEditor::new(None).unwrap();
        editor.load_html(html);
        editor
    }

    #[test]
    fn test_sanitize_html() {
        let clean = sanitize_html_js("<p>hi</p><script>alert(1)</script>", false);
        assert_eq!(clean, "<p>hi</p>");
        let fallback = sanitize_html_js("<p>hi</p><script>alert(1)</script>", true);
        assert_eq!(fallback, "<p>hi</p>");
    }

    #[test]
    fn test_parse_then_serialize() {
        let json = parse_html_js("<h2>Title</h2><p>Body</p>").unwrap();
        let html = serialize_document_js(&json).unwrap();
        assert_eq!(html, "<h2>Title</h2><p>Body</p>");
    }

    #[test]
    fn test_exec_and_undo() {
        let mut editor = editor("<p>Hello world</p>");
        assert!(editor.set_selection(0, 5));
        assert!(editor.exec("bold", None).unwrap());
        assert!(editor.get_html().contains("<strong>Hello</strong>"));
        assert!(editor.can_undo());

        assert!(editor.undo());
        assert_eq!(editor.get_html(), "<p>Hello world</p>");
        assert!(editor.can_redo());
    }

    #[test]
    fn test_exec_with_payload() {
        let mut editor = editor("<p>text</p>");
        editor.set_selection(0, 4);
        assert!(!editor.exec("fontSize", Some("97".to_string())).unwrap());
        assert!(editor.exec("fontSize", Some("16".to_string())).unwrap());
        assert!(editor.get_html().contains("font-size: 16px"));
    }

    #[test]
    fn test_config_from_json() {
        let editor = BerryEditor::new(Some(r#"{"historyLimit": 5}"#.to_string())).unwrap();
        assert_eq!(editor.inner.config().history_limit, 5);
    }

    #[test]
    fn test_attachment_lifecycle() {
        let mut editor = editor("<p>ab</p>");
        editor.set_selection(1, 1);
        let id = editor
            .insert_attachment_placeholder(r#"{"filename":"a.png","filesize":10,"contentType":"image/png"}"#)
            .unwrap()
            .unwrap();
        assert!(editor.get_html().contains("data-berry-pending"));

        assert!(editor
            .resolve_attachment(&id, r#"{"url":"https://cdn.test/a.png"}"#)
            .unwrap());
        assert!(editor.get_html().contains("https://cdn.test/a.png"));
        assert!(editor.get_image_attachment_state(&id).unwrap().contains("\"id\""));
    }
}
