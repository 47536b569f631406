use std::collections::{HashMap, HashSet};
use std::fs;
use std::ops::Range;
use std::path::Path;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::resource_types::{KeyInsert, RemovedKey};
use crate::utils::ResxError;

/// 文件文本编码（写回时保持不变）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8 { bom: bool },
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    /// 按 BOM 识别编码并解码；无 BOM 时按 UTF-8 处理
    fn decode(bytes: &[u8]) -> Result<(String, Self), ResxError> {
        let (encoding, bom_len) = Encoding::for_bom(bytes).unwrap_or((UTF_8, 0));
        let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        if had_errors {
            return Err(ResxError::Xml(format!("invalid {} text", encoding.name())));
        }

        let detected = if encoding == UTF_16LE {
            TextEncoding::Utf16Le
        } else if encoding == UTF_16BE {
            TextEncoding::Utf16Be
        } else {
            TextEncoding::Utf8 { bom: bom_len > 0 }
        };
        Ok((text.into_owned(), detected))
    }

    fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 { bom } => {
                let mut out = Vec::with_capacity(text.len() + 3);
                if *bom {
                    out.extend_from_slice(&[0xEF, 0xBB, 0xBF]);
                }
                out.extend_from_slice(text.as_bytes());
                out
            }
            TextEncoding::Utf16Le => {
                let mut out = vec![0xFF, 0xFE];
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_le_bytes());
                }
                out
            }
            TextEncoding::Utf16Be => {
                let mut out = vec![0xFE, 0xFF];
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_be_bytes());
                }
                out
            }
        }
    }
}

/// `<value>` 在源文本中的位置
#[derive(Debug, Clone, PartialEq, Eq)]
enum ValueSlot {
    /// `<value>…</value>` 的内容区间
    Content(Range<usize>),
    /// `<value/>` 整个标签
    Empty(Range<usize>),
    /// 没有 value 子元素，记录 `</data>` 的起点
    Missing(usize),
    /// `<data …/>` 自闭合元素末尾的 `/>`
    Collapsed(Range<usize>),
}

/// 一个 `<data>` 条目及其源文本区间
#[derive(Debug, Clone)]
struct DataEntry {
    key: String,
    value: String,
    /// 含前导空白的整个块
    block: Range<usize>,
    /// `<data` 的起点
    element_start: usize,
    /// name 属性值（引号内）
    name: Range<usize>,
    slot: ValueSlot,
}

/// 批量插入时最终顺序中的一个位置
enum Slot<'a> {
    Existing(usize),
    New(&'a KeyInsert),
}

/// 解析过程中尚未闭合的 `<data>`
struct PendingEntry {
    key: String,
    element_start: usize,
    name: Range<usize>,
    value: String,
    value_open: Option<usize>,
    slot: Option<ValueSlot>,
}

/// ResX 文档
///
/// 只追踪 `<data name="…">` 元素的文本区间，所有修改都是对源文本的局部替换，
/// 其余内容（注释、schema、resheader、缩进）原样保留。
/// 条目在文件中的先后顺序即存储位置。
#[derive(Debug, Clone)]
pub struct ResxDocument {
    text: String,
    encoding: TextEncoding,
    entries: Vec<DataEntry>,
}

impl ResxDocument {
    /// 从 XML 文本创建文档（UTF-8，无 BOM）
    pub fn parse(text: impl Into<String>) -> Result<Self, ResxError> {
        let text = text.into();
        let entries = parse_entries(&text)?;
        Ok(Self {
            text,
            encoding: TextEncoding::Utf8 { bom: false },
            entries,
        })
    }

    /// 从文件加载
    pub fn load(path: &Path) -> Result<Self, ResxError> {
        let bytes = fs::read(path)?;
        let (text, encoding) = TextEncoding::decode(&bytes)?;
        let entries = parse_entries(&text)?;
        Ok(Self {
            text,
            encoding,
            entries,
        })
    }

    /// 按原编码写回文件
    pub fn save(&self, path: &Path) -> Result<(), ResxError> {
        fs::write(path, self.encoding.encode(&self.text))?;
        Ok(())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按存储顺序返回所有键
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.key.as_str()).collect()
    }

    /// 按存储顺序返回所有键值对
    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    /// 键的存储位置
    pub fn position_of(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }

    /// 设置键的值；键不存在时追加到末尾
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ResxError> {
        match self.position_of(key) {
            Some(index) => {
                let (range, replacement) = self.value_splice(index, value);
                self.splice(range, &replacement)
            }
            None => self.append(key, value).map(|_| ()),
        }
    }

    /// 批量设置值
    ///
    /// 已有键一次性原地替换；不存在的键按键名顺序追加到末尾。整个过程最多重新解析两次。
    pub fn set_values(&mut self, updates: &HashMap<String, String>) -> Result<(), ResxError> {
        let mut missing: Vec<&String> = Vec::new();
        let splices = {
            let index: HashMap<&str, usize> = self
                .entries
                .iter()
                .enumerate()
                .map(|(i, e)| (e.key.as_str(), i))
                .collect();
            let mut splices = Vec::with_capacity(updates.len());
            for (key, value) in updates {
                match index.get(key.as_str()) {
                    Some(&i) => splices.push(self.value_splice(i, value)),
                    None => missing.push(key),
                }
            }
            splices
        };
        if !splices.is_empty() {
            self.apply_splices(splices)?;
        }

        missing.sort();
        let end = self.entries.len();
        let appended: Vec<KeyInsert> = missing
            .into_iter()
            .enumerate()
            .map(|(i, key)| KeyInsert::new(key.clone(), updates[key].clone(), end + i))
            .collect();
        self.insert_many(&appended)
    }

    /// 重命名键；旧键不存在时不做任何修改
    pub fn rename_key(&mut self, old_key: &str, new_key: &str) -> Result<(), ResxError> {
        if old_key == new_key {
            return Ok(());
        }
        let Some(index) = self.position_of(old_key) else {
            return Ok(());
        };
        if self.position_of(new_key).is_some() {
            return Err(ResxError::KeyExists(new_key.to_string()));
        }
        let range = self.entries[index].name.clone();
        self.splice(range, &escape(new_key))
    }

    /// 在指定存储位置插入新键，超出范围时追加；返回实际位置
    pub fn insert_at(&mut self, key: &str, value: &str, position: usize) -> Result<usize, ResxError> {
        let position = position.min(self.entries.len());
        self.insert_many(&[KeyInsert::new(key, value, position)])?;
        Ok(position)
    }

    /// 追加新键到末尾
    pub fn append(&mut self, key: &str, value: &str) -> Result<usize, ResxError> {
        self.insert_at(key, value, self.entries.len())
    }

    /// 批量插入
    ///
    /// 结果等同于按位置升序逐个插入。带 `block` 的项写回删除时保存的原文，
    /// 其余项生成新的 `<data>` 条目。所有插入一次性拼接，只重新解析一次。
    pub fn insert_many(&mut self, items: &[KeyInsert]) -> Result<(), ResxError> {
        let mut seen = HashSet::new();
        for item in items {
            if self.position_of(&item.key).is_some() || !seen.insert(item.key.as_str()) {
                return Err(ResxError::KeyExists(item.key.clone()));
            }
        }
        if items.is_empty() {
            return Ok(());
        }

        let mut ordered: Vec<&KeyInsert> = items.iter().collect();
        ordered.sort_by_key(|item| item.position);

        // 先在序号上模拟逐个插入，得到最终顺序
        let mut layout: Vec<Slot> = (0..self.entries.len()).map(Slot::Existing).collect();
        for item in ordered {
            let at = item.position.min(layout.len());
            layout.insert(at, Slot::New(item));
        }

        // 新条目挂在其后第一个已有条目之前；其后没有已有条目的挂在末尾
        let mut splices: Vec<(Range<usize>, String)> = Vec::new();
        let mut pending = String::new();
        for slot in &layout {
            match slot {
                Slot::New(item) => pending.push_str(&self.block_for(item)),
                Slot::Existing(i) => {
                    if !pending.is_empty() {
                        let at = self.entries[*i].block.start;
                        splices.push((at..at, std::mem::take(&mut pending)));
                    }
                }
            }
        }
        if !pending.is_empty() {
            splices.push(self.tail_splice(pending)?);
        }

        let expected = self.entries.len() + items.len();
        let previous = self.text.clone();
        self.apply_splices(splices)?;
        if self.entries.len() != expected || items.iter().any(|item| self.position_of(&item.key).is_none()) {
            self.text = previous;
            self.entries = parse_entries(&self.text)?;
            return Err(ResxError::Xml("restored entry does not match its key".to_string()));
        }
        Ok(())
    }

    /// 删除键，返回删除前的存储位置和条目原文
    pub fn remove_key(&mut self, key: &str) -> Result<RemovedKey, ResxError> {
        let mut removed = self.remove_keys(&[key.to_string()])?;
        removed
            .remove(key)
            .ok_or_else(|| ResxError::KeyNotFound(key.to_string()))
    }

    /// 批量删除键，返回每个键删除前的存储位置和条目原文
    ///
    /// 任一键不存在时不做任何修改。
    pub fn remove_keys(&mut self, keys: &[String]) -> Result<HashMap<String, RemovedKey>, ResxError> {
        let mut removed = HashMap::with_capacity(keys.len());
        let mut splices = Vec::with_capacity(keys.len());
        for key in keys {
            if removed.contains_key(key) {
                continue;
            }
            let index = self
                .position_of(key)
                .ok_or_else(|| ResxError::KeyNotFound(key.clone()))?;
            let range = self.entries[index].block.clone();
            removed.insert(
                key.clone(),
                RemovedKey {
                    position: index,
                    block: Some(self.text[range.clone()].to_string()),
                },
            );
            splices.push((range, String::new()));
        }

        self.apply_splices(splices)?;
        Ok(removed)
    }

    fn splice(&mut self, range: Range<usize>, replacement: &str) -> Result<(), ResxError> {
        self.apply_splices(vec![(range, replacement.to_string())])
    }

    /// 从后往前应用互不重叠的替换，最后重新解析一次；解析失败时文档不变
    fn apply_splices(&mut self, mut splices: Vec<(Range<usize>, String)>) -> Result<(), ResxError> {
        splices.sort_by_key(|(range, _)| std::cmp::Reverse(range.start));
        let mut text = self.text.clone();
        for (range, replacement) in splices {
            text.replace_range(range, &replacement);
        }
        let entries = parse_entries(&text)?;
        self.text = text;
        self.entries = entries;
        Ok(())
    }

    /// 写入新值所需的替换
    fn value_splice(&self, index: usize, value: &str) -> (Range<usize>, String) {
        let escaped = escape(value);
        match self.entries[index].slot.clone() {
            ValueSlot::Content(range) => (range, escaped.into_owned()),
            ValueSlot::Empty(range) => (range, format!("<value>{}</value>", escaped)),
            ValueSlot::Missing(at) => (at..at, format!("<value>{}</value>", escaped)),
            ValueSlot::Collapsed(range) => (range, format!("><value>{}</value></data>", escaped)),
        }
    }

    /// 追加到最后一个条目之后；没有条目时放在 `</root>` 之前
    fn tail_splice(&self, blocks: String) -> Result<(Range<usize>, String), ResxError> {
        if let Some(last) = self.entries.last() {
            let at = last.block.end;
            return Ok((at..at, blocks));
        }
        let close = self
            .text
            .rfind("</root>")
            .ok_or_else(|| ResxError::Xml("missing </root> element".to_string()))?;
        let ws_start = leading_whitespace_start(&self.text, close);
        Ok((ws_start..close, format!("{}{}", blocks, self.newline())))
    }

    fn block_for(&self, item: &KeyInsert) -> String {
        match &item.block {
            Some(block) => block.clone(),
            None => self.render_block(&item.key, &item.value),
        }
    }

    fn newline(&self) -> &'static str {
        if self.text.contains("\r\n") {
            "\r\n"
        } else {
            "\n"
        }
    }

    /// 沿用已有条目的缩进，默认两个空格
    fn indent(&self) -> String {
        self.entries
            .first()
            .map(|e| {
                let ws = &self.text[e.block.start..e.element_start];
                ws.rsplit('\n').next().unwrap_or("").to_string()
            })
            .filter(|indent| !indent.is_empty())
            .unwrap_or_else(|| "  ".to_string())
    }

    fn render_block(&self, key: &str, value: &str) -> String {
        let nl = self.newline();
        let ind = self.indent();
        format!(
            "{nl}{ind}<data name=\"{key}\" xml:space=\"preserve\">{nl}{ind}{ind}<value>{value}</value>{nl}{ind}</data>",
            nl = nl,
            ind = ind,
            key = escape(key),
            value = escape(value),
        )
    }
}

/// 解析所有具名 `<data>` 条目
fn parse_entries(text: &str) -> Result<Vec<DataEntry>, ResxError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut entries = Vec::new();
    let mut current: Option<PendingEntry> = None;

    loop {
        let start = reader.buffer_position() as usize;
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                return Err(ResxError::Xml(format!(
                    "error at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        };
        let end = reader.buffer_position() as usize;

        match event {
            Event::Start(ref e) if e.name().as_ref() == b"data" => {
                if let Some(key) = data_name(e)? {
                    current = Some(PendingEntry {
                        key,
                        element_start: start,
                        name: find_name_span(text, start, end)?,
                        value: String::new(),
                        value_open: None,
                        slot: None,
                    });
                }
            }
            Event::Empty(ref e) if e.name().as_ref() == b"data" => {
                if let Some(key) = data_name(e)? {
                    entries.push(DataEntry {
                        key,
                        value: String::new(),
                        block: leading_whitespace_start(text, start)..end,
                        element_start: start,
                        name: find_name_span(text, start, end)?,
                        slot: ValueSlot::Collapsed(end - 2..end),
                    });
                }
            }
            Event::Start(ref e) if e.name().as_ref() == b"value" => {
                if let Some(pending) = current.as_mut() {
                    pending.value.clear();
                    pending.value_open = Some(end);
                }
            }
            Event::Empty(ref e) if e.name().as_ref() == b"value" => {
                if let Some(pending) = current.as_mut() {
                    pending.slot = Some(ValueSlot::Empty(start..end));
                }
            }
            Event::Text(ref e) => {
                if let Some(pending) = current.as_mut() {
                    if pending.value_open.is_some() {
                        pending.value.push_str(&e.unescape()?);
                    }
                }
            }
            Event::CData(ref e) => {
                if let Some(pending) = current.as_mut() {
                    if pending.value_open.is_some() {
                        pending.value.push_str(&String::from_utf8_lossy(e));
                    }
                }
            }
            Event::End(ref e) if e.name().as_ref() == b"value" => {
                if let Some(pending) = current.as_mut() {
                    if let Some(open) = pending.value_open.take() {
                        pending.slot = Some(ValueSlot::Content(open..start));
                    }
                }
            }
            Event::End(ref e) if e.name().as_ref() == b"data" => {
                if let Some(pending) = current.take() {
                    entries.push(DataEntry {
                        key: pending.key,
                        value: pending.value,
                        block: leading_whitespace_start(text, pending.element_start)..end,
                        element_start: pending.element_start,
                        name: pending.name,
                        slot: pending.slot.unwrap_or(ValueSlot::Missing(start)),
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

/// 读取 `<data>` 的 name 属性；缺失或为空时返回 None
fn data_name(e: &BytesStart) -> Result<Option<String>, ResxError> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"name" {
            let name = attr.unescape_value()?.into_owned();
            return Ok(if name.is_empty() { None } else { Some(name) });
        }
    }
    Ok(None)
}

/// 在开始标签源文本中定位 name 属性值的区间
fn find_name_span(text: &str, start: usize, end: usize) -> Result<Range<usize>, ResxError> {
    let tag = &text.as_bytes()[start..end];
    let mut i = 1;
    while i + 4 <= tag.len() {
        if &tag[i..i + 4] == b"name" && tag[i - 1].is_ascii_whitespace() {
            let mut j = i + 4;
            while j < tag.len() && tag[j].is_ascii_whitespace() {
                j += 1;
            }
            if j < tag.len() && tag[j] == b'=' {
                j += 1;
                while j < tag.len() && tag[j].is_ascii_whitespace() {
                    j += 1;
                }
                if j < tag.len() && (tag[j] == b'"' || tag[j] == b'\'') {
                    let quote = tag[j];
                    let value_start = j + 1;
                    if let Some(len) = tag[value_start..].iter().position(|&b| b == quote) {
                        return Ok(start + value_start..start + value_start + len);
                    }
                }
            }
        }
        i += 1;
    }
    Err(ResxError::Xml("data element without name attribute".to_string()))
}

fn leading_whitespace_start(text: &str, pos: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = pos;
    while i > 0 && matches!(bytes[i - 1], b' ' | b'\t' | b'\r' | b'\n') {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<root>
  <resheader name="resmimetype">
    <value>text/microsoft-resx</value>
  </resheader>
  <data name="k1" xml:space="preserve">
    <value>one</value>
  </data>
  <data name="k2" xml:space="preserve">
    <value>two &amp; more</value>
    <comment>keep me</comment>
  </data>
  <data name="k3" xml:space="preserve">
    <value>three</value>
  </data>
</root>"#;

    #[test]
    fn test_parse_entries_in_order() {
        let doc = ResxDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.keys(), vec!["k1", "k2", "k3"]);
        assert_eq!(doc.get("k2"), Some("two & more"));
        // resheader 不是数据条目
        assert_eq!(doc.position_of("resmimetype"), None);
    }

    #[test]
    fn test_set_value_preserves_comment() {
        let mut doc = ResxDocument::parse(SAMPLE).unwrap();
        doc.set_value("k2", "<b>").unwrap();
        assert_eq!(doc.get("k2"), Some("<b>"));
        assert!(doc.text().contains("<value>&lt;b&gt;</value>"));
        assert!(doc.text().contains("<comment>keep me</comment>"));
        assert_eq!(doc.get("k1"), Some("one"));
    }

    #[test]
    fn test_set_value_missing_key_appends() {
        let mut doc = ResxDocument::parse(SAMPLE).unwrap();
        doc.set_value("k4", "four").unwrap();
        assert_eq!(doc.keys(), vec!["k1", "k2", "k3", "k4"]);
    }

    #[test]
    fn test_remove_and_reinsert_restores_text() {
        let mut doc = ResxDocument::parse(SAMPLE).unwrap();
        let removed = doc.remove_key("k2").unwrap();
        assert_eq!(removed.position, 1);
        assert_eq!(doc.keys(), vec!["k1", "k3"]);

        doc.insert_at("k2", "two", removed.position).unwrap();
        assert_eq!(doc.keys(), vec!["k1", "k2", "k3"]);
        assert_eq!(doc.get("k2"), Some("two"));
    }

    #[test]
    fn test_reinserting_removed_block_restores_exact_text() {
        let mut doc = ResxDocument::parse(SAMPLE).unwrap();
        let removed = doc.remove_key("k2").unwrap();
        assert!(!doc.text().contains("keep me"));

        let item = KeyInsert::new("k2", "ignored", removed.position).with_block(removed.block);
        doc.insert_many(&[item]).unwrap();
        assert_eq!(doc.text(), SAMPLE);
    }

    #[test]
    fn test_block_with_wrong_key_is_rejected() {
        let mut doc = ResxDocument::parse(SAMPLE).unwrap();
        let removed = doc.remove_key("k1").unwrap();
        let before = doc.text().to_string();

        let item = KeyInsert::new("other", "", 0).with_block(removed.block);
        assert!(doc.insert_many(&[item]).is_err());
        assert_eq!(doc.text(), before);
    }

    #[test]
    fn test_set_values_updates_and_appends_in_one_pass() {
        let mut doc = ResxDocument::parse(SAMPLE).unwrap();
        let updates: HashMap<String, String> = [("k3", "drei"), ("k1", ""), ("z", "new"), ("y", "also")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        doc.set_values(&updates).unwrap();
        assert_eq!(doc.keys(), vec!["k1", "k2", "k3", "y", "z"]);
        assert_eq!(doc.get("k1"), Some(""));
        assert_eq!(doc.get("k3"), Some("drei"));
        assert!(doc.text().contains("<comment>keep me</comment>"));
    }

    #[test]
    fn test_remove_keys_reports_original_positions() {
        let mut doc = ResxDocument::parse(SAMPLE).unwrap();
        let removed = doc
            .remove_keys(&["k3".to_string(), "k1".to_string()])
            .unwrap();
        assert_eq!(removed["k1"].position, 0);
        assert_eq!(removed["k3"].position, 2);
        assert_eq!(doc.keys(), vec!["k2"]);

        let items = vec![KeyInsert::new("k3", "three", 2), KeyInsert::new("k1", "one", 0)];
        doc.insert_many(&items).unwrap();
        assert_eq!(doc.keys(), vec!["k1", "k2", "k3"]);
    }

    #[test]
    fn test_adjacent_blocks_restore_in_one_batch() {
        let mut doc = ResxDocument::parse(SAMPLE).unwrap();
        let removed = doc
            .remove_keys(&["k2".to_string(), "k3".to_string()])
            .unwrap();
        let items: Vec<KeyInsert> = removed
            .into_iter()
            .map(|(key, r)| KeyInsert::new(key, "", r.position).with_block(r.block))
            .collect();
        doc.insert_many(&items).unwrap();
        assert_eq!(doc.text(), SAMPLE);
    }

    #[test]
    fn test_remove_keys_missing_key_leaves_document() {
        let mut doc = ResxDocument::parse(SAMPLE).unwrap();
        let result = doc.remove_keys(&["k1".to_string(), "nope".to_string()]);
        assert!(matches!(result, Err(ResxError::KeyNotFound(_))));
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn test_rename_key() {
        let mut doc = ResxDocument::parse(SAMPLE).unwrap();
        doc.rename_key("k1", "first").unwrap();
        assert_eq!(doc.keys(), vec!["first", "k2", "k3"]);
        assert!(matches!(
            doc.rename_key("first", "k2"),
            Err(ResxError::KeyExists(_))
        ));
        // 旧键不存在时不修改
        doc.rename_key("missing", "other").unwrap();
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn test_insert_into_empty_root() {
        let mut doc = ResxDocument::parse("<root>\n</root>").unwrap();
        doc.append("Hello", "World").unwrap();
        assert_eq!(doc.keys(), vec!["Hello"]);
        assert_eq!(doc.get("Hello"), Some("World"));
        assert!(doc.text().ends_with("</data>\n</root>"));
    }

    #[test]
    fn test_self_closing_data_and_value() {
        let text = "<root>\n  <data name=\"a\"/>\n  <data name=\"b\"><value/></data>\n</root>";
        let mut doc = ResxDocument::parse(text).unwrap();
        assert_eq!(doc.get("a"), Some(""));
        assert_eq!(doc.get("b"), Some(""));

        doc.set_value("a", "x").unwrap();
        doc.set_value("b", "y").unwrap();
        assert_eq!(doc.get("a"), Some("x"));
        assert_eq!(doc.get("b"), Some("y"));
        assert_eq!(doc.keys(), vec!["a", "b"]);
    }

    #[test]
    fn test_crlf_layout_is_kept() {
        let text = "<root>\r\n    <data name=\"a\">\r\n        <value>1</value>\r\n    </data>\r\n</root>";
        let mut doc = ResxDocument::parse(text).unwrap();
        doc.append("b", "2").unwrap();
        assert!(doc.text().contains("\r\n    <data name=\"b\" xml:space=\"preserve\">\r\n"));
        assert!(!doc.text().replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn test_encoding_round_trip() {
        let bytes = TextEncoding::Utf8 { bom: true }.encode("<root/>");
        let (text, encoding) = TextEncoding::decode(&bytes).unwrap();
        assert_eq!(text, "<root/>");
        assert_eq!(encoding, TextEncoding::Utf8 { bom: true });

        let bytes = TextEncoding::Utf16Le.encode("<root/>");
        let (text, encoding) = TextEncoding::decode(&bytes).unwrap();
        assert_eq!(text, "<root/>");
        assert_eq!(encoding, TextEncoding::Utf16Le);
    }
}
