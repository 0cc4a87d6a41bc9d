use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, ErrorKind, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::err::CResult;

/// 读取 json 文件. 文件不存在时返回 None
pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> CResult<Option<T>> {
    let file = match File::open(path.as_ref()) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let value = serde_json::from_reader(BufReader::new(file))?;
    Ok(Some(value))
}

/// 写入 json 文件. 先写临时文件再 rename, 不会留下写了一半的文件
pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> CResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = path.with_extension("tmp");
    {
        let mut f = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)?;
        serde_json::to_writer(&mut f, value)?;
        f.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
