//! 构建时生成表盘图标 icon.ico 并嵌入 Windows 可执行文件

const SECTOR: [u8; 4] = [217, 17, 83, 255];
const FACE: [u8; 4] = [238, 238, 242, 255];
const RIM: [u8; 4] = [80, 80, 90, 255];

/// 表盘图标：浅色底盘 + 深色外圈 + 右上四分之一红色扇区
fn make_rgba_dial(size: u32) -> Vec<u8> {
    let c = (size as f32) * 0.5;
    let outer = (size as f32) * 0.46;
    let rim = outer - (size as f32 / 16.0).max(1.0);
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let dx = (x as f32) + 0.5 - c;
            let dy = (y as f32) + 0.5 - c;
            let d = (dx * dx + dy * dy).sqrt();
            let pixel = if d > outer {
                [0, 0, 0, 0]
            } else if d > rim {
                RIM
            } else if dx >= 0.0 && dy <= 0.0 {
                SECTOR
            } else {
                FACE
            };
            rgba.extend_from_slice(&pixel);
        }
    }
    rgba
}

fn main() {
    #[cfg(windows)]
    {
        let manifest_dir = std::path::PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap());
        let icon_path = manifest_dir.join("icon.ico");

        let mut icon_dir = ico::IconDir::new(ico::ResourceType::Icon);
        for &size in &[16u32, 32u32, 48u32] {
            let image = ico::IconImage::from_rgba_data(size, size, make_rgba_dial(size));
            let entry = ico::IconDirEntry::encode(&image).expect("encode icon entry");
            icon_dir.add_entry(entry);
        }

        let mut file = std::fs::File::create(&icon_path).expect("create icon.ico");
        icon_dir.write(&mut file).expect("write icon.ico");

        let mut res = winres::WindowsResource::new();
        res.set_icon("icon.ico");
        if let Err(e) = res.compile() {
            eprintln!("winres: {} (no rc.exe available, icon not embedded)", e);
        }
    }
}
