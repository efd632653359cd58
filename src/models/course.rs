//! 课程内容（静态）
//!
//! 问答与练习题的提示词都以这份讲义为依据。

use phf::phf_map;

/// 讲义全文：Triết học Mác – Lênin, II. Giai cấp và Dân tộc
pub const COURSE_CONTENT: &str = include_str!("course.md");

/// 可以生成示例的概念，按页面上的显示顺序
pub const CONCEPTS: [(&str, &str); 4] = [
    ("bộ tộc", "Bộ Tộc"),
    ("thị tộc", "Thị Tộc"),
    ("bộ lạc", "Bộ Lạc"),
    ("dân tộc", "Dân Tộc"),
];

static CONCEPT_CONTENT: phf::Map<&'static str, &'static str> = phf_map! {
    "thị tộc" => "## Thị tộc

Thị tộc là hình thức tổ chức xã hội đầu tiên trong lịch sử xã hội loài người. Thị tộc được hình thành trên cơ sở quan hệ huyết thống, những người trong thị tộc có chung tổ tiên. Trong thị tộc, tư liệu sản xuất thuộc sở hữu chung, mọi người cùng lao động và hưởng thụ sản phẩm theo nguyên tắc bình quân. Chưa có sự phân chia giai cấp, chưa có bóc lột.

Đặc điểm chính:
- Tổ chức dựa trên huyết thống
- Tư liệu sản xuất chung sở hữu
- Lao động chung
- Phân phối theo nguyên tắc bình quân
- Chưa có giai cấp và bóc lột",

    "bộ lạc" => "## Bộ lạc

Bộ lạc là sự liên minh của nhiều thị tộc có quan hệ huyết thống gần gũi, cùng sinh sống trên một vùng lãnh thổ tương đối ổn định. Bộ lạc có ngôn ngữ chung, phong tục tập quán chung và có tổ chức quản lý sơ khai (tù trưởng, hội đồng già làng). Bộ lạc đánh dấu bước phát triển cao hơn so với thị tộc nhưng vẫn thuộc xã hội chưa có giai cấp.

Đặc điểm chính:
- Liên minh của nhiều thị tộc
- Cùng sinh sống trên một lãnh thổ
- Ngôn ngữ và phong tục chung
- Tổ chức quản lý sơ khai
- Chưa có sự phân chia giai cấp",

    "bộ tộc" => "## Bộ tộc

Bộ tộc là hình thức cộng đồng người phát triển cao hơn bộ lạc, hình thành khi các bộ lạc khác nhau liên kết lại với nhau trên cơ sở lãnh thổ, kinh tế và văn hóa tương đối ổn định. Trong bộ tộc đã xuất hiện sự phân hóa giàu nghèo, mầm mống của chế độ tư hữu và giai cấp, là tiền đề cho sự ra đời của dân tộc.

Đặc điểm chính:
- Liên kết nhiều bộ lạc
- Lãnh thổ ổn định
- Kinh tế và văn hóa phát triển
- Xuất hiện giai cấp sơ khai
- Tiền đề của dân tộc",

    "dân tộc" => "## Dân tộc

Dân tộc là một cộng đồng người ổn định, hình thành trên cơ sở lãnh thổ thống nhất, ngôn ngữ thống nhất, đời sống kinh tế thống nhất, nền văn hóa và tâm lý, tính cách bền vững. Dân tộc có nhà nước và pháp luật thống nhất.

Đặc điểm chính:
- Lãnh thổ thống nhất
- Ngôn ngữ thống nhất
- Kinh tế thống nhất
- Văn hóa bền vững
- Nhà nước và pháp luật riêng
- Là hình thức phát triển cao nhất của cộng đồng người",
};

/// 查找概念的参考内容（先做大小写与首尾空白归一）
pub fn concept_content(concept: &str) -> Option<&'static str> {
    CONCEPT_CONTENT.get(concept.trim().to_lowercase().as_str()).copied()
}
