use crate::error::InputError;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 支持的图像扩展名及其 MIME 类型
static IMAGE_MIME_TYPES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "jpg" => "image/jpeg",
    "jpeg" => "image/jpeg",
    "png" => "image/png",
    "bmp" => "image/bmp",
};

/// 根据扩展名（不区分大小写）获取 MIME 类型，不支持的格式返回 None
pub fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    IMAGE_MIME_TYPES.get(ext.as_str()).copied()
}

/// 扫描文件夹中的图像文件
///
/// 只返回扩展名在允许列表内的普通文件，按文件名字典序排序，
/// 保证输出命名和测试结果可复现。
pub async fn scan_folder(folder: &Path) -> Result<Vec<PathBuf>, InputError> {
    let is_dir = fs::metadata(folder)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(InputError::NotFound {
            path: folder.to_path_buf(),
        });
    }

    let unreadable = |source| InputError::Unreadable {
        path: folder.to_path_buf(),
        source,
    };

    let mut images = Vec::new();
    let mut entries = fs::read_dir(folder).await.map_err(unreadable)?;

    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        let path = entry.path();
        if mime_type_for(&path).is_none() {
            continue;
        }
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {
                tracing::debug!(
                    "发现图像: {}",
                    path.file_name().unwrap_or_default().to_string_lossy()
                );
                images.push(path);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("无法读取文件信息 {}: {}", path.display(), e),
        }
    }

    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(images)
}

/// 扫描文件夹，没有任何图像时返回错误
pub async fn require_images(folder: &Path) -> Result<Vec<PathBuf>, InputError> {
    let images = scan_folder(folder).await?;
    if images.is_empty() {
        return Err(InputError::NoImages {
            path: folder.to_path_buf(),
        });
    }
    tracing::info!("✓ 找到 {} 张图像", images.len());
    Ok(images)
}
