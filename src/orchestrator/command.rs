use clap::Subcommand;

/// 命令行子命令
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Hỏi đáp về nội dung môn học
    Ask {
        question: String,
    },
    /// Tạo sơ đồ tư duy cho một chủ đề
    Mindmap {
        topic: String,
    },
    /// Tạo 10 câu hỏi trắc nghiệm luyện tập
    Practice {
        /// In kèm đáp án
        #[arg(long)]
        show_answers: bool,
    },
    /// Tạo ví dụ cho một khái niệm (bỏ trống để xem danh sách)
    Concept {
        name: Option<String>,
    },
    /// Đăng nhập bằng tài khoản mẫu
    Login {
        username: String,
        password: String,
    },
    Logout,
    Whoami,
    /// Bảng hỏi đáp cộng đồng
    Board {
        #[command(subcommand)]
        action: BoardAction,
    },
    /// Ghi nhận một lượt truy cập và in bộ đếm
    Visit,
    /// Đặt lại bộ đếm truy cập (quản trị viên)
    ResetCounter,
}

#[derive(Debug, Clone, Subcommand)]
pub enum BoardAction {
    List {
        /// Chỉ câu hỏi của tôi
        #[arg(long)]
        mine: bool,
    },
    Submit {
        content: String,
    },
    Reply {
        id: String,
        answer: String,
    },
    Remove {
        id: String,
    },
    /// Theo dõi thay đổi cho đến khi nhấn Ctrl-C
    Watch,
}
