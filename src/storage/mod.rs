// 存储模块 - 任务文件的导入导出

pub mod task_file;

pub use task_file::{from_xml, read_task_file, to_xml, write_task_file};
