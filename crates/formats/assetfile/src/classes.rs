/// Display name for common Unity class ids.
pub fn class_name(class_id: i32) -> Option<&'static str> {
    Some(match class_id {
        1 => "GameObject",
        4 => "Transform",
        21 => "Material",
        28 => "Texture2D",
        43 => "Mesh",
        48 => "Shader",
        49 => "TextAsset",
        74 => "AnimationClip",
        83 => "AudioClip",
        90 => "Avatar",
        91 => "AnimatorController",
        114 => "MonoBehaviour",
        115 => "MonoScript",
        128 => "Font",
        142 => "AssetBundle",
        150 => "PreloadData",
        213 => "Sprite",
        224 => "RectTransform",
        _ => return None,
    })
}

/// Like [`class_name`], falling back to `Class<id>`.
pub fn display_class(class_id: i32) -> String {
    match class_name(class_id) {
        Some(name) => name.to_string(),
        None => format!("Class{class_id}"),
    }
}
