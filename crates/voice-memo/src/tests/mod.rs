mod console_handler;
